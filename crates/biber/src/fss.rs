//! Function secret sharing: distributed comparison functions and interval
//! containment.
//!
//! A DCF key pair shares the function `f(x) = β·[x < α]` (β = 1): key
//! generation walks the W-bit prefix tree of α once, expanding a 128-bit
//! state per level with an AES-based PRG into `(sL, sR, vL, vR, tL, tR)` and
//! emitting one correction word per level. Evaluation is local and
//! non-interactive; the two parties' results are additive shares.
//!
//! Interval containment `[p ≤ x ≤ q]` reduces to two DCF evaluations on the
//! masked input x̂ = x + r_in plus a key-dependent constant; the point
//! (equality) function is the degenerate interval `[α, α]`.
//!
//! Key generation is a dealer-style offline step: it needs the input mask
//! r_in in the clear and therefore runs outside the two-party protocol.

use crate::ring::Ring;
use biber_ot::aes_rng::AesRng;
use biber_ot::Block;
use rand::{CryptoRng, Rng, RngCore};

/// Output value of the shared indicator functions.
const BETA: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectionWord<T> {
    s: Block,
    v: T,
    t_l: bool,
    t_r: bool,
}

/// One party's DCF key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DcfKey<T> {
    s: Block,
    cw: Vec<CorrectionWord<T>>,
    last_cw: T,
}

/// One party's interval-containment key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IcKey<T> {
    pub(crate) dcf: DcfKey<T>,
    /// Additive share of the interval adjustment constant.
    pub(crate) z: T,
}

struct Expanded<T> {
    s_l: Block,
    s_r: Block,
    v_l: T,
    v_r: T,
    t_l: bool,
    t_r: bool,
}

/// Per-level PRG: expands the 128-bit state into both child states, the
/// value words and the control bits.
fn expand<T: Ring>(s: Block) -> Expanded<T> {
    let mut prg = AesRng::from_block(s);
    let mut block = [0u8; 16];
    prg.fill_bytes(&mut block);
    let s_l = Block::from_le_bytes(block);
    prg.fill_bytes(&mut block);
    let s_r = Block::from_le_bytes(block);
    let mut value = vec![0u8; T::BYTES];
    prg.fill_bytes(&mut value);
    let v_l = bytemuck::pod_read_unaligned(&value);
    prg.fill_bytes(&mut value);
    let v_r = bytemuck::pod_read_unaligned(&value);
    let mut t = [0u8; 1];
    prg.fill_bytes(&mut t);
    Expanded {
        s_l,
        s_r,
        v_l,
        v_r,
        t_l: t[0] & 1 != 0,
        t_r: t[0] & 2 != 0,
    }
}

fn block_to_ring<T: Ring>(s: Block) -> T {
    bytemuck::pod_read_unaligned(&s.to_le_bytes()[..T::BYTES])
}

/// Conditionally negated accumulation: party 1 subtracts, party 0 adds.
fn signed_add<T: Ring>(acc: T, term: T, negate: bool) -> T {
    if negate {
        acc.wrapping_sub(&term)
    } else {
        acc.wrapping_add(&term)
    }
}

/// Generates a DCF key pair for `f(x) = [x < alpha]`.
pub fn dcf_gen<T: Ring, R: Rng + CryptoRng>(alpha: T, rng: &mut R) -> (DcfKey<T>, DcfKey<T>) {
    let mut s0 = Block::random(rng);
    let mut s1 = Block::random(rng);
    let root0 = s0;
    let root1 = s1;
    let mut t0 = false;
    let mut t1 = true;
    let mut v_alpha = T::ZERO;
    let mut cw_chain = Vec::with_capacity(T::BITS);

    for i in 0..T::BITS {
        // walk MSB first
        let alpha_bit = alpha.get_bit(T::BITS - 1 - i);
        let g0 = expand::<T>(s0);
        let g1 = expand::<T>(s1);
        let (s0_keep, s0_lose, v0_keep, v0_lose, t0_keep) = if alpha_bit {
            (g0.s_r, g0.s_l, g0.v_r, g0.v_l, g0.t_r)
        } else {
            (g0.s_l, g0.s_r, g0.v_l, g0.v_r, g0.t_l)
        };
        let (s1_keep, s1_lose, v1_keep, v1_lose, t1_keep) = if alpha_bit {
            (g1.s_r, g1.s_l, g1.v_r, g1.v_l, g1.t_r)
        } else {
            (g1.s_l, g1.s_r, g1.v_l, g1.v_r, g1.t_l)
        };

        let s_cw = s0_lose ^ s1_lose;
        // the lose branch is left of alpha exactly when alpha_bit is set
        let mut v_cw = v1_lose.wrapping_sub(&v0_lose).wrapping_sub(&v_alpha);
        if alpha_bit {
            v_cw = v_cw.wrapping_add(&T::from_bool(BETA != 0));
        }
        if t1 {
            v_cw = v_cw.wrapping_neg();
        }
        v_alpha = v_alpha
            .wrapping_add(&v0_keep)
            .wrapping_sub(&v1_keep)
            .wrapping_add(&signed_add(T::ZERO, v_cw, t1));
        let t_cw_l = g0.t_l ^ g1.t_l ^ alpha_bit ^ true;
        let t_cw_r = g0.t_r ^ g1.t_r ^ alpha_bit;
        cw_chain.push(CorrectionWord {
            s: s_cw,
            v: v_cw,
            t_l: t_cw_l,
            t_r: t_cw_r,
        });

        s0 = if t0 { s0_keep ^ s_cw } else { s0_keep };
        t0 = t0_keep ^ (t0 & if alpha_bit { t_cw_r } else { t_cw_l });
        s1 = if t1 { s1_keep ^ s_cw } else { s1_keep };
        t1 = t1_keep ^ (t1 & if alpha_bit { t_cw_r } else { t_cw_l });
    }

    let mut last_cw = block_to_ring::<T>(s1)
        .wrapping_sub(&block_to_ring::<T>(s0))
        .wrapping_sub(&v_alpha);
    if t1 {
        last_cw = last_cw.wrapping_neg();
    }

    let k0 = DcfKey {
        s: root0,
        cw: cw_chain.clone(),
        last_cw,
    };
    let k1 = DcfKey {
        s: root1,
        cw: cw_chain,
        last_cw,
    };
    (k0, k1)
}

/// Evaluates one party's DCF share on the public input.
pub fn dcf_eval<T: Ring>(party: bool, key: &DcfKey<T>, x: T) -> T {
    let mut value = T::ZERO;
    let mut t = party;
    let mut s = key.s;

    for (i, cw) in key.cw.iter().enumerate() {
        let g = expand::<T>(s);
        let x_bit = x.get_bit(T::BITS - 1 - i);
        let (s_branch, v_branch, t_branch, t_cw) = if x_bit {
            (g.s_r, g.v_r, g.t_r, cw.t_r)
        } else {
            (g.s_l, g.v_l, g.t_l, cw.t_l)
        };
        let mut term = v_branch;
        if t {
            term = term.wrapping_add(&cw.v);
        }
        value = signed_add(value, term, party);
        s = if t { s_branch ^ cw.s } else { s_branch };
        t = t_branch ^ (t & t_cw);
    }

    let mut term = block_to_ring::<T>(s);
    if t {
        term = term.wrapping_add(&key.last_cw);
    }
    signed_add(value, term, party)
}

/// Generates an interval-containment key pair for `[p ≤ x ≤ q]` under input
/// mask `r_in` and output mask `r_out`.
pub fn ic_gen<T: Ring, R: Rng + CryptoRng>(
    r_in: T,
    r_out: T,
    p: T,
    q: T,
    rng: &mut R,
) -> (IcKey<T>, IcKey<T>) {
    let (dcf0, dcf1) = dcf_gen(r_in.wrapping_sub(&T::ONE), rng);
    let z0 = T::random(rng);
    let alpha_p = p.wrapping_add(&r_in);
    let alpha_q = q.wrapping_add(&r_in);
    let alpha_q_prime = alpha_q.wrapping_add(&T::ONE);
    let mut z = r_out;
    z = z.wrapping_add(&T::from_bool(alpha_p > alpha_q));
    z = z.wrapping_sub(&T::from_bool(alpha_p > p));
    z = z.wrapping_add(&T::from_bool(alpha_q_prime > q.wrapping_add(&T::ONE)));
    z = z.wrapping_add(&T::from_bool(alpha_q_prime == T::ZERO));
    let z1 = z.wrapping_sub(&z0);
    (
        IcKey { dcf: dcf0, z: z0 },
        IcKey { dcf: dcf1, z: z1 },
    )
}

/// Evaluates one party's IC share on the masked public input x̂ = x + r_in.
pub fn ic_eval<T: Ring>(party: bool, p: T, q: T, key: &IcKey<T>, x_hat: T) -> T {
    let out1 = dcf_eval(
        party,
        &key.dcf,
        x_hat.wrapping_sub(&p).wrapping_sub(&T::ONE),
    );
    let out2 = dcf_eval(
        party,
        &key.dcf,
        x_hat.wrapping_sub(&q).wrapping_sub(&T::ONE).wrapping_sub(&T::ONE),
    );
    let mut out = T::ZERO;
    if party {
        out = out
            .wrapping_add(&T::from_bool(x_hat > p))
            .wrapping_sub(&T::from_bool(x_hat > q.wrapping_add(&T::ONE)));
    }
    out.wrapping_sub(&out1).wrapping_add(&out2).wrapping_add(&key.z)
}

/// Equality keys: the degenerate interval `[alpha, alpha]`.
pub fn dpf_gen<T: Ring, R: Rng + CryptoRng>(
    r_in: T,
    r_out: T,
    alpha: T,
    rng: &mut R,
) -> (IcKey<T>, IcKey<T>) {
    ic_gen(r_in, r_out, alpha, alpha, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn reconstruct_dcf<T: Ring>(k0: &DcfKey<T>, k1: &DcfKey<T>, x: T) -> T {
        dcf_eval(false, k0, x).wrapping_add(&dcf_eval(true, k1, x))
    }

    #[test]
    fn dcf_is_comparison() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        for _ in 0..10 {
            let alpha: u16 = rng.gen();
            let (k0, k1) = dcf_gen(alpha, &mut rng);
            for _ in 0..32 {
                let x: u16 = rng.gen();
                let expected = u16::from(x < alpha);
                assert_eq!(expected, reconstruct_dcf(&k0, &k1, x), "x={x} alpha={alpha}");
            }
            // boundary cases
            assert_eq!(0, reconstruct_dcf(&k0, &k1, alpha));
            if alpha > 0 {
                assert_eq!(1, reconstruct_dcf(&k0, &k1, alpha - 1));
            }
        }
    }

    #[test]
    fn dcf_u8_exhaustive() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        let alpha: u8 = 100;
        let (k0, k1) = dcf_gen(alpha, &mut rng);
        for x in 0..=u8::MAX {
            assert_eq!(u8::from(x < alpha), reconstruct_dcf(&k0, &k1, x), "x={x}");
        }
    }

    #[test]
    fn ic_is_interval_membership() {
        let mut rng = ChaChaRng::seed_from_u64(11);
        let p: u16 = 1000;
        let q: u16 = 2000;
        for _ in 0..10 {
            let r_in: u16 = rng.gen();
            let (k0, k1) = ic_gen(r_in, 0, p, q, &mut rng);
            for &x in &[0u16, 999, 1000, 1500, 2000, 2001, 60000] {
                let x_hat = x.wrapping_add(r_in);
                let res = ic_eval(false, p, q, &k0, x_hat)
                    .wrapping_add(ic_eval(true, p, q, &k1, x_hat));
                let expected = u16::from(p <= x && x <= q);
                assert_eq!(expected, res, "x={x} r_in={r_in}");
            }
        }
    }

    #[test]
    fn dpf_is_equality() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        let alpha: u16 = 4242;
        let r_in: u16 = rng.gen();
        let (k0, k1) = dpf_gen(r_in, 0, alpha, &mut rng);
        for &x in &[alpha, alpha.wrapping_add(1), alpha.wrapping_sub(1), 0, u16::MAX] {
            let x_hat = x.wrapping_add(r_in);
            let res = ic_eval(false, alpha, alpha, &k0, x_hat)
                .wrapping_add(ic_eval(true, alpha, alpha, &k1, x_hat));
            assert_eq!(u16::from(x == alpha), res, "x={x}");
        }
    }

    #[test]
    fn evaluations_are_masked_shares() {
        let mut rng = ChaChaRng::seed_from_u64(17);
        let (k0, k1) = dcf_gen(300u16, &mut rng);
        // the individual shares look unrelated to the result
        let share0 = dcf_eval(false, &k0, 100);
        let share1 = dcf_eval(true, &k1, 100);
        assert_eq!(1, share0.wrapping_add(share1));
        assert_ne!(share0, 1);
    }
}
