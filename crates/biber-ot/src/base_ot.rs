//! Chou-Orlandi base OT protocol.
//!
//! Produces the κ random OTs that seed the extension. The sender obtains
//! `count` key pairs, the receiver one key per pair selected by its choice
//! bit. Point arithmetic on Ristretto, random-oracle hashing with Blake2.

use crate::{BitVector, Block, OtError};
use biber_channel::{Receiver as ChanReceiver, Sender as ChanSender};
use blake2::{Blake2b512, Blake2s256, Digest};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone)]
pub struct Sender;

#[derive(Debug, Default, Clone)]
pub struct Receiver;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum BaseOtMsg {
    /// Sender's point together with a commitment to the hash seed.
    First(RistrettoPoint, [u8; 32]),
    /// Receiver's blinded points, one per OT.
    Second(Vec<RistrettoPoint>),
    /// Opening of the seed commitment.
    Third(Block),
}

impl Sender {
    /// Sends `count` random OTs, returning the key pairs.
    pub async fn send_random<RNG>(
        &mut self,
        count: usize,
        rng: &mut RNG,
        tx: &ChanSender<BaseOtMsg>,
        rx: &mut ChanReceiver<BaseOtMsg>,
    ) -> Result<Vec<[Block; 2]>, OtError>
    where
        RNG: RngCore + CryptoRng + Send,
    {
        let a = Scalar::random(rng);
        let big_a = RistrettoPoint::mul_base(&a);
        let seed = Block::random(rng);
        tx.send(BaseOtMsg::First(big_a, seed_commitment(seed)))
            .await?;
        let points = match rx.recv().await.ok_or(OtError::UnexpectedTermination)? {
            BaseOtMsg::Second(points) => points,
            _ => return Err(OtError::WrongOrder),
        };
        if points.len() != count {
            return Err(OtError::UnexpectedTermination);
        }
        tx.send(BaseOtMsg::Third(seed)).await?;
        let a_big_a = big_a * a;
        let ots = points
            .into_iter()
            .enumerate()
            .map(|(i, point)| {
                let point_a = point * a;
                let k0 = rom_hash_point(&point_a, i, seed);
                let k1 = rom_hash_point(&(point_a - a_big_a), i, seed);
                [k0, k1]
            })
            .collect();
        Ok(ots)
    }
}

impl Receiver {
    /// Receives one random OT per choice bit, returning the selected keys.
    pub async fn receive_random<RNG>(
        &mut self,
        choices: &BitVector,
        rng: &mut RNG,
        tx: &ChanSender<BaseOtMsg>,
        rx: &mut ChanReceiver<BaseOtMsg>,
    ) -> Result<Vec<Block>, OtError>
    where
        RNG: RngCore + CryptoRng + Send,
    {
        let (big_a, commitment) = match rx.recv().await.ok_or(OtError::UnexpectedTermination)? {
            BaseOtMsg::First(point, commitment) => (point, commitment),
            _ => return Err(OtError::WrongOrder),
        };
        let (scalars, points): (Vec<_>, Vec<_>) = choices
            .iter()
            .by_vals()
            .map(|choice| {
                let b = Scalar::random(rng);
                let point_b = RistrettoPoint::mul_base(&b);
                let blinded = if choice { big_a + point_b } else { point_b };
                (b, blinded)
            })
            .unzip();
        tx.send(BaseOtMsg::Second(points)).await?;
        let seed = match rx.recv().await.ok_or(OtError::UnexpectedTermination)? {
            BaseOtMsg::Third(seed) => seed,
            _ => return Err(OtError::WrongOrder),
        };
        if commitment != seed_commitment(seed) {
            return Err(OtError::ProtocolDeviation);
        }
        let ots = scalars
            .into_iter()
            .enumerate()
            .map(|(i, b)| rom_hash_point(&(big_a * b), i, seed))
            .collect();
        Ok(ots)
    }
}

fn seed_commitment(seed: Block) -> [u8; 32] {
    let mut hasher = Blake2s256::new();
    hasher.update(seed.to_le_bytes());
    hasher.finalize().into()
}

/// Hashes a point with its index and the shared seed into a key block.
fn rom_hash_point(point: &RistrettoPoint, counter: usize, seed: Block) -> Block {
    let mut rom = Blake2b512::new();
    rom.update(point.compress().as_bytes());
    rom.update(counter.to_le_bytes());
    rom.update(seed.to_le_bytes());
    let digest = rom.finalize();
    let bytes: [u8; 16] = digest[..16].try_into().expect("blake2b512 yields 64 bytes");
    Block::from_le_bytes(bytes)
}

/// Samples `count` random bits, the receiver's choices for the base OTs.
pub fn random_choices<RNG: Rng>(count: usize, rng: &mut RNG) -> BitVector {
    let mut bytes = vec![0u8; count.div_ceil(8)];
    rng.fill_bytes(&mut bytes);
    let mut bits = BitVector::from_vec(bytes);
    bits.truncate(count);
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    #[tokio::test]
    async fn base_rot() {
        let ((tx0, mut rx0), (tx1, mut rx1)) = biber_channel::in_memory::default_pair();
        let mut rng_send = ChaChaRng::seed_from_u64(42);
        let mut rng_recv = ChaChaRng::seed_from_u64(42 * 42);
        let choices = random_choices(128, &mut rng_recv);
        let choices_clone = choices.clone();

        let send = async {
            Sender
                .send_random(128, &mut rng_send, &tx0, &mut rx0)
                .await
        };
        let receive = async {
            Receiver
                .receive_random(&choices_clone, &mut rng_recv, &tx1, &mut rx1)
                .await
        };
        let (sender_out, receiver_out) = tokio::try_join!(send, receive).unwrap();
        for ((pair, chosen), choice) in sender_out
            .into_iter()
            .zip(receiver_out)
            .zip(choices.iter().by_vals())
        {
            assert_eq!(pair[choice as usize], chosen);
            assert_ne!(pair[0], pair[1]);
        }
    }
}
