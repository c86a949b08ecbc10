//! Two-party OT extension tests over in-memory channels.

use biber_ot::extension::{OtExtension, OtMsg};
use biber_ot::{base_ot, BitVector, Block};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use std::sync::Arc;

/// Connects two providers and spawns their message routers.
fn connected_pair() -> (Arc<OtExtension>, Arc<OtExtension>) {
    let ((tx0, mut rx0), (tx1, mut rx1)) = biber_channel::in_memory::new_pair::<OtMsg>(256);
    let party0 = Arc::new(OtExtension::new(tx0));
    let party1 = Arc::new(OtExtension::new(tx1));
    let router0 = Arc::clone(&party0);
    tokio::spawn(async move {
        while let Some(msg) = rx0.recv().await {
            router0.handle_message(msg).await.unwrap();
        }
    });
    let router1 = Arc::clone(&party1);
    tokio::spawn(async move {
        while let Some(msg) = rx1.recv().await {
            router1.handle_message(msg).await.unwrap();
        }
    });
    (party0, party1)
}

async fn run_setups(party0: &OtExtension, party1: &OtExtension) {
    let mut rng0 = ChaChaRng::seed_from_u64(42);
    let mut rng1 = ChaChaRng::seed_from_u64(42 * 42);
    let (send_res, recv_res) =
        tokio::join!(party0.send_setup(&mut rng0), party1.receive_setup(&mut rng1));
    send_res.unwrap();
    recv_res.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn acot_u64() {
    let (party0, party1) = connected_pair();
    let num_ots = 1000;
    let mut sender = party0.register_send_acot::<u64>(num_ots, 1);
    let mut receiver = party1.register_receive_acot::<u64>(num_ots, 1);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(7);
    let correlations: Vec<u64> = (0..num_ots).map(|_| rng.gen()).collect();
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_correlations(correlations.clone());
    receiver.set_choices(choices.clone());

    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
        sender.compute_outputs().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for (i, choice) in choices.iter().by_vals().enumerate() {
        let expected = if choice {
            sender.outputs()[i].wrapping_add(correlations[i])
        } else {
            sender.outputs()[i]
        };
        assert_eq!(expected, receiver.outputs()[i], "wrong output for OT {i}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn acot_u16_vectorized() {
    let (party0, party1) = connected_pair();
    let num_ots = 64;
    let vector_size = 3;
    let mut sender = party0.register_send_acot::<u16>(num_ots, vector_size);
    let mut receiver = party1.register_receive_acot::<u16>(num_ots, vector_size);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(11);
    let correlations: Vec<u16> = (0..num_ots * vector_size).map(|_| rng.gen()).collect();
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_correlations(correlations.clone());
    receiver.set_choices(choices.clone());
    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
        sender.compute_outputs().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for i in 0..num_ots {
        for k in 0..vector_size {
            let idx = i * vector_size + k;
            let expected = if choices[i] {
                sender.outputs()[idx].wrapping_add(correlations[idx])
            } else {
                sender.outputs()[idx]
            };
            assert_eq!(expected, receiver.outputs()[idx]);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn xcot_bit() {
    let (party0, party1) = connected_pair();
    let num_ots = 500;
    let mut sender = party0.register_send_xcot_bit(num_ots);
    let mut receiver = party1.register_receive_xcot_bit(num_ots);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(13);
    let correlations = base_ot::random_choices(num_ots, &mut rng);
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_correlations(correlations.clone());
    receiver.set_choices(choices.clone());
    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
        sender.compute_outputs().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for i in 0..num_ots {
        assert_eq!(
            sender.outputs()[i] ^ (choices[i] & correlations[i]),
            receiver.outputs()[i],
            "wrong XCOT output for OT {i}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fixed_xcot_128() {
    let (party0, party1) = connected_pair();
    let num_ots = 200;
    let mut sender = party0.register_send_fixed_xcot_128(num_ots);
    let mut receiver = party1.register_receive_fixed_xcot_128(num_ots);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(17);
    let correlation = Block::random(&mut rng);
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_correlation(correlation);
    receiver.set_choices(choices.clone());
    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
        sender.compute_outputs().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for i in 0..num_ots {
        let expected = if choices[i] {
            sender.outputs()[i] ^ correlation
        } else {
            sender.outputs()[i]
        };
        assert_eq!(expected, receiver.outputs()[i]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn got_128_chosen_messages() {
    let (party0, party1) = connected_pair();
    let num_ots = 128;
    let mut sender = party0.register_send_got_128(num_ots);
    let mut receiver = party1.register_receive_got_128(num_ots);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(19);
    let inputs: Vec<Block> = (0..2 * num_ots).map(|_| Block::random(&mut rng)).collect();
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_inputs(inputs.clone());
    receiver.set_choices(choices.clone());
    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for (i, choice) in choices.iter().by_vals().enumerate() {
        assert_eq!(
            inputs[2 * i + choice as usize],
            receiver.outputs()[i],
            "receiver got the wrong message for OT {i}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn got_bit_chosen_messages() {
    let (party0, party1) = connected_pair();
    let num_ots = 300;
    let mut sender = party0.register_send_got_bit(num_ots);
    let mut receiver = party1.register_receive_got_bit(num_ots);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(23);
    let inputs = base_ot::random_choices(2 * num_ots, &mut rng);
    let choices = base_ot::random_choices(num_ots, &mut rng);

    sender.set_inputs(inputs.clone());
    receiver.set_choices(choices.clone());
    let recv_side = async {
        receiver.send_corrections().await.unwrap();
        receiver.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender.send_messages().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for (i, choice) in choices.iter().by_vals().enumerate() {
        assert_eq!(inputs[2 * i + choice as usize], receiver.outputs()[i]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rot_relation() {
    let (party0, party1) = connected_pair();
    let num_ots = 256;
    let vector_size = 8;
    let mut sender = party0.register_send_rot(num_ots, vector_size);
    let mut receiver = party1.register_receive_rot(num_ots, vector_size);
    run_setups(&party0, &party1).await;

    let send_side = async { sender.compute_outputs().await.unwrap() };
    let recv_side = async { receiver.compute_outputs().await.unwrap() };
    tokio::join!(send_side, recv_side);

    for i in 0..num_ots {
        let choice = receiver.choices()[i];
        let expected: &BitVector = &sender.outputs()[i][choice as usize];
        assert_eq!(expected, &receiver.outputs()[i]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_order_batches() {
    // the second batch completes before the first one
    let (party0, party1) = connected_pair();
    let mut sender_a = party0.register_send_xcot_bit(32);
    let mut sender_b = party0.register_send_xcot_bit(16);
    let mut receiver_a = party1.register_receive_xcot_bit(32);
    let mut receiver_b = party1.register_receive_xcot_bit(16);
    run_setups(&party0, &party1).await;

    let mut rng = ChaChaRng::seed_from_u64(29);
    let corr_a = base_ot::random_choices(32, &mut rng);
    let corr_b = base_ot::random_choices(16, &mut rng);
    let choices_a = base_ot::random_choices(32, &mut rng);
    let choices_b = base_ot::random_choices(16, &mut rng);

    sender_a.set_correlations(corr_a.clone());
    sender_b.set_correlations(corr_b.clone());
    receiver_a.set_choices(choices_a.clone());
    receiver_b.set_choices(choices_b.clone());

    let recv_side = async {
        receiver_b.send_corrections().await.unwrap();
        receiver_b.compute_outputs().await.unwrap();
        receiver_a.send_corrections().await.unwrap();
        receiver_a.compute_outputs().await.unwrap();
    };
    let send_side = async {
        sender_b.send_messages().await.unwrap();
        sender_b.compute_outputs().await.unwrap();
        sender_a.send_messages().await.unwrap();
        sender_a.compute_outputs().await.unwrap();
    };
    tokio::join!(recv_side, send_side);

    for i in 0..32 {
        assert_eq!(
            sender_a.outputs()[i] ^ (choices_a[i] & corr_a[i]),
            receiver_a.outputs()[i]
        );
    }
    for i in 0..16 {
        assert_eq!(
            sender_b.outputs()[i] ^ (choices_b[i] & corr_b[i]),
            receiver_b.outputs()[i]
        );
    }
}
