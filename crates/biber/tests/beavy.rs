//! End-to-end two-party tests for the BEAVY gates.

mod common;

use biber::common::BitVec;
use common::connected_backends;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

fn bits_of(value: u64, len: usize) -> Vec<BitVec> {
    (0..len)
        .map(|i| {
            let mut bv = BitVec::new();
            bv.push(value >> i & 1 == 1);
            bv
        })
        .collect()
}

fn bitvec_from(bits: &[bool]) -> BitVec {
    bits.iter().copied().collect()
}

macro_rules! arithmetic_round_trip {
    ($name:ident, $t:ty, $value:expr, $owner:expr) => {
        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn $name() {
            common::init_tracing();
            let (mut b0, mut b1) = connected_backends().await;
            let owner: usize = $owner;
            let value: $t = $value;

            let party0 = async move {
                let beavy = b0.beavy();
                let (input, wire) = beavy.make_arithmetic_input_gate_my::<$t>(0, 1).unwrap();
                let output = if owner == 0 {
                    Some(beavy.make_arithmetic_output_gate::<$t>(&wire, owner).unwrap())
                } else {
                    beavy
                        .make_arithmetic_output_gate_other::<$t>(&wire, owner)
                        .unwrap();
                    None
                };
                input.set(vec![value]).unwrap();
                b0.run().await.unwrap();
                match output {
                    Some(fut) => Some(fut.get().await.unwrap()),
                    None => None,
                }
            };
            let party1 = async move {
                let beavy = b1.beavy();
                let wire = beavy
                    .make_arithmetic_input_gate_other::<$t>(0, 1)
                    .unwrap();
                let output = if owner == 1 {
                    Some(beavy.make_arithmetic_output_gate::<$t>(&wire, owner).unwrap())
                } else {
                    beavy
                        .make_arithmetic_output_gate_other::<$t>(&wire, owner)
                        .unwrap();
                    None
                };
                b1.run().await.unwrap();
                match output {
                    Some(fut) => Some(fut.get().await.unwrap()),
                    None => None,
                }
            };
            let (res0, res1) = tokio::join!(party0, party1);
            let plain = res0.or(res1).expect("one party owns the output");
            assert_eq!(vec![value], plain);
        }
    };
}

arithmetic_round_trip!(arithmetic_round_trip_u8_owner0, u8, 201, 0);
arithmetic_round_trip!(arithmetic_round_trip_u16_owner0, u16, 12345, 0);
arithmetic_round_trip!(arithmetic_round_trip_u16_owner1, u16, 12345, 1);
arithmetic_round_trip!(arithmetic_round_trip_u32_owner1, u32, 0xdead_beef, 1);
arithmetic_round_trip!(arithmetic_round_trip_u64_owner0, u64, u64::MAX - 17, 0);

async fn eval_and(bit_a: bool, bit_b: bool) -> bool {
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_boolean_input_gate_my(0, 1, 1).unwrap();
        let b = beavy.make_boolean_input_gate_other(1, 1, 1).unwrap();
        let y = beavy.make_and_gate(&a, &b).unwrap();
        let out = beavy.make_boolean_output_gate_my(0, &y).unwrap();
        input.set(vec![bitvec_from(&[bit_a])]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_boolean_input_gate_other(0, 1, 1).unwrap();
        let (input, b) = beavy.make_boolean_input_gate_my(1, 1, 1).unwrap();
        let y = beavy.make_and_gate(&a, &b).unwrap();
        beavy.make_boolean_output_gate_other(0, &y).unwrap();
        input.set(vec![bitvec_from(&[bit_b])]).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    res[0][0]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn boolean_and_truth_table() {
    common::init_tracing();
    assert!(!eval_and(true, false).await);
    assert!(eval_and(true, true).await);
    assert!(!eval_and(false, false).await);
    assert!(!eval_and(false, true).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn boolean_and_simd_256() {
    common::init_tracing();
    let mut rng = ChaChaRng::seed_from_u64(42);
    let bits_a: Vec<bool> = (0..256).map(|_| rng.gen()).collect();
    let bits_b: Vec<bool> = (0..256).map(|_| rng.gen()).collect();
    let expected: Vec<bool> = bits_a.iter().zip(&bits_b).map(|(a, b)| a & b).collect();

    let (mut b0, mut b1) = connected_backends().await;
    let input_a = bitvec_from(&bits_a);
    let input_b = bitvec_from(&bits_b);
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_boolean_input_gate_my(0, 1, 256).unwrap();
        let b = beavy.make_boolean_input_gate_other(1, 1, 256).unwrap();
        let y = beavy.make_and_gate(&a, &b).unwrap();
        let out = beavy.make_boolean_output_gate_my(0, &y).unwrap();
        input.set(vec![input_a]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_boolean_input_gate_other(0, 1, 256).unwrap();
        let (input, b) = beavy.make_boolean_input_gate_my(1, 1, 256).unwrap();
        let y = beavy.make_and_gate(&a, &b).unwrap();
        beavy.make_boolean_output_gate_other(0, &y).unwrap();
        input.set(vec![input_b]).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(bitvec_from(&expected), res[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn arithmetic_mul_u32_simd4() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_arithmetic_input_gate_my::<u32>(0, 4).unwrap();
        let b = beavy.make_arithmetic_input_gate_other::<u32>(1, 4).unwrap();
        let y = beavy.make_mul_gate(&a, &b).unwrap();
        let out = beavy.make_arithmetic_output_gate::<u32>(&y, 0).unwrap();
        input.set(vec![1, 2, 3, 4]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_arithmetic_input_gate_other::<u32>(0, 4).unwrap();
        let (input, b) = beavy.make_arithmetic_input_gate_my::<u32>(1, 4).unwrap();
        let y = beavy.make_mul_gate(&a, &b).unwrap();
        beavy.make_arithmetic_output_gate_other::<u32>(&y, 0).unwrap();
        input.set(vec![10, 20, 30, 40]).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(vec![10, 40, 90, 160], res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn linear_gates_add_neg_xor() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input_a, a) = beavy.make_arithmetic_input_gate_my::<u16>(0, 2).unwrap();
        let b = beavy.make_arithmetic_input_gate_other::<u16>(1, 2).unwrap();
        let sum = beavy.make_add_gate(&a, &b).unwrap();
        let neg = beavy.make_neg_gate(&sum);
        let out = beavy.make_arithmetic_output_gate::<u16>(&neg, 0).unwrap();

        let (input_x, x) = beavy.make_boolean_input_gate_my(0, 1, 8).unwrap();
        let y = beavy.make_boolean_input_gate_other(1, 1, 8).unwrap();
        let xored = beavy.make_xor_gate(&x, &y).unwrap();
        let inv = beavy.make_inv_gate(&xored).unwrap();
        let out_bits = beavy.make_boolean_output_gate_my(0, &inv).unwrap();

        input_a.set(vec![100, 200]).unwrap();
        input_x
            .set(vec![bitvec_from(&[true, false, true, false, true, false, true, false])])
            .unwrap();
        b0.run().await.unwrap();
        (out.get().await.unwrap(), out_bits.get().await.unwrap())
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_arithmetic_input_gate_other::<u16>(0, 2).unwrap();
        let (input_b, b) = beavy.make_arithmetic_input_gate_my::<u16>(1, 2).unwrap();
        let sum = beavy.make_add_gate(&a, &b).unwrap();
        let neg = beavy.make_neg_gate(&sum);
        beavy.make_arithmetic_output_gate_other::<u16>(&neg, 0).unwrap();

        let x = beavy.make_boolean_input_gate_other(0, 1, 8).unwrap();
        let (input_y, y) = beavy.make_boolean_input_gate_my(1, 1, 8).unwrap();
        let xored = beavy.make_xor_gate(&x, &y).unwrap();
        let inv = beavy.make_inv_gate(&xored).unwrap();
        beavy.make_boolean_output_gate_other(0, &inv).unwrap();

        input_b.set(vec![11, 22]).unwrap();
        input_y
            .set(vec![bitvec_from(&[true, true, false, false, true, true, false, false])])
            .unwrap();
        b1.run().await.unwrap();
    };
    let ((ints, bits), ()) = tokio::join!(party0, party1);
    assert_eq!(vec![0u16.wrapping_sub(111), 0u16.wrapping_sub(222)], ints);
    // !(x ^ y)
    let expected = bitvec_from(&[true, false, false, true, true, false, false, true]);
    assert_eq!(expected, bits[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bit_to_arithmetic_simd8() {
    common::init_tracing();
    let mut rng = ChaChaRng::seed_from_u64(7);
    let bits: Vec<bool> = (0..8).map(|_| rng.gen()).collect();
    let expected: Vec<u32> = bits.iter().map(|&b| b as u32).collect();

    let (mut b0, mut b1) = connected_backends().await;
    let input_bits = bitvec_from(&bits);
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wires) = beavy.make_boolean_input_gate_my(0, 1, 8).unwrap();
        let arith = beavy.make_convert_bit_to_arithmetic_gate::<u32>(&wires[0]);
        let out = beavy.make_arithmetic_output_gate::<u32>(&arith, 0).unwrap();
        input.set(vec![input_bits]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wires = beavy.make_boolean_input_gate_other(0, 1, 8).unwrap();
        let arith = beavy.make_convert_bit_to_arithmetic_gate::<u32>(&wires[0]);
        beavy.make_arithmetic_output_gate_other::<u32>(&arith, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn boolean_to_arithmetic_u16() {
    common::init_tracing();
    let value: u16 = 0xa5c3;
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wires) = beavy.make_boolean_input_gate_my(0, 16, 1).unwrap();
        let arith = beavy.make_convert_to_arithmetic_gate::<u16>(&wires).unwrap();
        let out = beavy.make_arithmetic_output_gate::<u16>(&arith, 0).unwrap();
        input.set(bits_of(value as u64, 16)).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wires = beavy.make_boolean_input_gate_other(0, 16, 1).unwrap();
        let arith = beavy.make_convert_to_arithmetic_gate::<u16>(&wires).unwrap();
        beavy.make_arithmetic_output_gate_other::<u16>(&arith, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(vec![value], res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hamming_weight_of_0x1234() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wires) = beavy.make_boolean_input_gate_my(0, 16, 1).unwrap();
        let ham = beavy.make_ham_gate::<u16>(&wires).unwrap();
        let out = beavy.make_arithmetic_output_gate::<u16>(&ham, 0).unwrap();
        input.set(bits_of(0x1234, 16)).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wires = beavy.make_boolean_input_gate_other(0, 16, 1).unwrap();
        let ham = beavy.make_ham_gate::<u16>(&wires).unwrap();
        beavy.make_arithmetic_output_gate_other::<u16>(&ham, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(vec![5], res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn square_gate_u64() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_arithmetic_input_gate_my::<u64>(0, 3).unwrap();
        let sq = beavy.make_sqr_gate(&a);
        let out = beavy.make_arithmetic_output_gate::<u64>(&sq, 0).unwrap();
        input.set(vec![3, 1 << 40, u64::MAX]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_arithmetic_input_gate_other::<u64>(0, 3).unwrap();
        let sq = beavy.make_sqr_gate(&a);
        beavy.make_arithmetic_output_gate_other::<u64>(&sq, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(
        vec![
            9,
            (1u64 << 40).wrapping_mul(1 << 40),
            u64::MAX.wrapping_mul(u64::MAX)
        ],
        res
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn boolean_x_arithmetic_mul() {
    common::init_tracing();
    let bits = [true, false, true, false];
    let ints: [u32; 4] = [1000, 2000, 3000, 4000];
    let expected: Vec<u32> = bits
        .iter()
        .zip(&ints)
        .map(|(&b, &n)| if b { n } else { 0 })
        .collect();

    let (mut b0, mut b1) = connected_backends().await;
    let input_bits = bitvec_from(&bits);
    let party0 = async move {
        let beavy = b0.beavy();
        let (input_b, bool_wires) = beavy.make_boolean_input_gate_my(0, 1, 4).unwrap();
        let n = beavy.make_arithmetic_input_gate_other::<u32>(1, 4).unwrap();
        let y = beavy
            .make_boolean_x_arithmetic_mul_gate(&bool_wires[0], &n)
            .unwrap();
        let out = beavy.make_arithmetic_output_gate::<u32>(&y, 0).unwrap();
        input_b.set(vec![input_bits]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let bool_wires = beavy.make_boolean_input_gate_other(0, 1, 4).unwrap();
        let (input_n, n) = beavy.make_arithmetic_input_gate_my::<u32>(1, 4).unwrap();
        let y = beavy
            .make_boolean_x_arithmetic_mul_gate(&bool_wires[0], &n)
            .unwrap();
        beavy.make_arithmetic_output_gate_other::<u32>(&y, 0).unwrap();
        input_n.set(ints.to_vec()).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dot_product_gate() {
    common::init_tracing();
    // <a, b> = ⊕ a_i & b_i with a = 1101, b = 1011 -> 1&1 ^ 1&0 ^ 0&1 ^ 1&1 = 0
    let bits_a = [true, true, false, true];
    let bits_b = [true, false, true, true];
    let expected = bits_a
        .iter()
        .zip(&bits_b)
        .fold(false, |acc, (a, b)| acc ^ (a & b));

    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_boolean_input_gate_my(0, 4, 1).unwrap();
        let b = beavy.make_boolean_input_gate_other(1, 4, 1).unwrap();
        let dot = beavy.make_dot_gate(&a, &b).unwrap();
        let out = beavy
            .make_boolean_output_gate_my(0, std::slice::from_ref(&dot))
            .unwrap();
        input
            .set(bits_a.iter().map(|&b| bitvec_from(&[b])).collect())
            .unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_boolean_input_gate_other(0, 4, 1).unwrap();
        let (input, b) = beavy.make_boolean_input_gate_my(1, 4, 1).unwrap();
        let dot = beavy.make_dot_gate(&a, &b).unwrap();
        beavy
            .make_boolean_output_gate_other(0, std::slice::from_ref(&dot))
            .unwrap();
        input
            .set(bits_b.iter().map(|&b| bitvec_from(&[b])).collect())
            .unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res[0][0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mulni_leaves_additive_halves() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party = |mut backend: biber::Backend, my_input: Option<Vec<u64>>| async move {
        let beavy = backend.beavy();
        let (a, b) = if backend.my_id() == 0 {
            let (input, a) = beavy.make_arithmetic_input_gate_my::<u64>(0, 2).unwrap();
            input.set(my_input.unwrap()).unwrap();
            let b = beavy.make_arithmetic_input_gate_other::<u64>(1, 2).unwrap();
            (a, b)
        } else {
            let a = beavy.make_arithmetic_input_gate_other::<u64>(0, 2).unwrap();
            let (input, b) = beavy.make_arithmetic_input_gate_my::<u64>(1, 2).unwrap();
            input.set(my_input.unwrap()).unwrap();
            (a, b)
        };
        let y = beavy.make_mulni_gate(&a, &b).unwrap();
        let (_secret, public) = beavy.make_arithmetic_output_share_gate::<u64>(&y);
        backend.run().await.unwrap();
        public.get().await.unwrap()
    };
    let (half0, half1) = tokio::join!(
        party(b0, Some(vec![3, 1 << 33])),
        party(b1, Some(vec![7, 12]))
    );
    // the parties' halves of the public-share field sum to the product
    assert_eq!(21, half0[0].wrapping_add(half1[0]));
    assert_eq!((1u64 << 33).wrapping_mul(12), half0[1].wrapping_add(half1[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn eqexp_equal_public_values() {
    common::init_tracing();
    // a regular wire carries the same public share at both parties, so the
    // expanded indicators collide and the equality bit is 1
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_arithmetic_input_gate_my::<u32>(0, 4).unwrap();
        let eq = beavy.make_eqexp_gate(&a, 32).unwrap();
        let out = beavy
            .make_boolean_output_gate_my(0, std::slice::from_ref(&eq))
            .unwrap();
        input.set(vec![5, 1234, 9, 31]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_arithmetic_input_gate_other::<u32>(0, 4).unwrap();
        let eq = beavy.make_eqexp_gate(&a, 32).unwrap();
        beavy
            .make_boolean_output_gate_other(0, std::slice::from_ref(&eq))
            .unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(bitvec_from(&[true, true, true, true]), res[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn eqexp_after_mulni_matches_plain_comparison() {
    common::init_tracing();
    const VEC_SIZE: usize = 16;
    let (mut b0, mut b1) = connected_backends().await;
    let party = |mut backend: biber::Backend, my_input: Vec<u16>| async move {
        let beavy = backend.beavy();
        let (a, b) = if backend.my_id() == 0 {
            let (input, a) = beavy.make_arithmetic_input_gate_my::<u16>(0, 4).unwrap();
            input.set(my_input).unwrap();
            let b = beavy.make_arithmetic_input_gate_other::<u16>(1, 4).unwrap();
            (a, b)
        } else {
            let a = beavy.make_arithmetic_input_gate_other::<u16>(0, 4).unwrap();
            let (input, b) = beavy.make_arithmetic_input_gate_my::<u16>(1, 4).unwrap();
            input.set(my_input).unwrap();
            (a, b)
        };
        let product_halves = beavy.make_mulni_gate(&a, &b).unwrap();
        let (_secret, half_future) =
            beavy.make_arithmetic_output_share_gate::<u16>(&product_halves);
        let eq = beavy.make_eqexp_gate(&product_halves, VEC_SIZE).unwrap();
        let eq_out = beavy
            .make_boolean_output_gate_my(biber::ALL_PARTIES, std::slice::from_ref(&eq))
            .unwrap();
        backend.run().await.unwrap();
        (
            half_future.get().await.unwrap(),
            eq_out.get().await.unwrap(),
        )
    };
    let ((half0, eq0), (half1, eq1)) = tokio::join!(
        party(b0, vec![3, 7, 11, 100]),
        party(b1, vec![5, 9, 2, 200])
    );
    assert_eq!(eq0, eq1);
    for simd_i in 0..4 {
        let expected =
            half0[simd_i] as usize % VEC_SIZE == half1[simd_i] as usize % VEC_SIZE;
        assert_eq!(expected, eq0[0][simd_i], "slot {simd_i}");
    }
}
