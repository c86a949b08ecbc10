//! End-to-end tests for the GMW gates, the BEAVY↔GMW conversions and the
//! FSS-backed gates.

mod common;

use biber::common::BitVec;
use biber::gate::fss_gate::{deal_dpf_keys, deal_ic_keys};
use biber::wire::WireRef;
use common::connected_backends;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

fn bitvec_from(bits: &[bool]) -> BitVec {
    bits.iter().copied().collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gmw_boolean_xor_and_inv() {
    common::init_tracing();
    let bits_a = [true, true, false, false];
    let bits_b = [true, false, true, false];

    let (mut b0, mut b1) = connected_backends().await;
    let input_a = bitvec_from(&bits_a);
    let input_b = bitvec_from(&bits_b);
    let party0 = async move {
        let gmw = b0.gmw();
        let (input, a) = gmw.make_boolean_input_gate_my(0, 1, 4).unwrap();
        let b = gmw.make_boolean_input_gate_other(1, 1, 4).unwrap();
        let xored = gmw.make_xor_gate(&a, &b).unwrap();
        let anded = gmw.make_and_gate(&a, &b).unwrap();
        let inv = gmw.make_inv_gate(&anded).unwrap();
        let out_xor = gmw.make_boolean_output_gate_my(0, &xored).unwrap();
        let out_inv = gmw.make_boolean_output_gate_my(0, &inv).unwrap();
        input.set(vec![input_a]).unwrap();
        b0.run().await.unwrap();
        (out_xor.get().await.unwrap(), out_inv.get().await.unwrap())
    };
    let party1 = async move {
        let gmw = b1.gmw();
        let a = gmw.make_boolean_input_gate_other(0, 1, 4).unwrap();
        let (input, b) = gmw.make_boolean_input_gate_my(1, 1, 4).unwrap();
        let xored = gmw.make_xor_gate(&a, &b).unwrap();
        let anded = gmw.make_and_gate(&a, &b).unwrap();
        let inv = gmw.make_inv_gate(&anded).unwrap();
        gmw.make_boolean_output_gate_other(0, &xored).unwrap();
        gmw.make_boolean_output_gate_other(0, &inv).unwrap();
        input.set(vec![input_b]).unwrap();
        b1.run().await.unwrap();
    };
    let ((xored, inv), ()) = tokio::join!(party0, party1);
    assert_eq!(bitvec_from(&[false, true, true, false]), xored[0]);
    assert_eq!(bitvec_from(&[false, true, true, true]), inv[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gmw_arithmetic_mul_and_sqr() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let gmw = b0.gmw();
        let (input, a) = gmw.make_arithmetic_input_gate_my::<u32>(0, 3).unwrap();
        let b = gmw.make_arithmetic_input_gate_other::<u32>(1, 3).unwrap();
        let prod = gmw.make_mul_gate(&a, &b);
        let square = gmw.make_sqr_gate(&a);
        let out_prod = gmw.make_arithmetic_output_gate::<u32>(&prod, 0).unwrap();
        let out_sqr = gmw.make_arithmetic_output_gate::<u32>(&square, 0).unwrap();
        input.set(vec![3, 5, 1 << 16]).unwrap();
        b0.run().await.unwrap();
        (out_prod.get().await.unwrap(), out_sqr.get().await.unwrap())
    };
    let party1 = async move {
        let gmw = b1.gmw();
        let a = gmw.make_arithmetic_input_gate_other::<u32>(0, 3).unwrap();
        let (input, b) = gmw.make_arithmetic_input_gate_my::<u32>(1, 3).unwrap();
        let prod = gmw.make_mul_gate(&a, &b);
        let square = gmw.make_sqr_gate(&a);
        gmw.make_arithmetic_output_gate_other::<u32>(&prod, 0).unwrap();
        gmw.make_arithmetic_output_gate_other::<u32>(&square, 0).unwrap();
        input.set(vec![7, 11, 9]).unwrap();
        b1.run().await.unwrap();
    };
    let ((prod, square), ()) = tokio::join!(party0, party1);
    assert_eq!(vec![21, 55, 9 << 16], prod);
    assert_eq!(vec![9, 25, (1u32 << 16).wrapping_mul(1 << 16)], square);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gmw_bit_to_arithmetic() {
    common::init_tracing();
    let bits = [true, false, false, true, true];
    let expected: Vec<u64> = bits.iter().map(|&b| b as u64).collect();

    let (mut b0, mut b1) = connected_backends().await;
    let input_bits = bitvec_from(&bits);
    let party0 = async move {
        let gmw = b0.gmw();
        let (input, wires) = gmw.make_boolean_input_gate_my(0, 1, 5).unwrap();
        let arith = gmw.make_bit_to_arithmetic_gate::<u64>(&wires[0]);
        let out = gmw.make_arithmetic_output_gate::<u64>(&arith, 0).unwrap();
        input.set(vec![input_bits]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let gmw = b1.gmw();
        let wires = gmw.make_boolean_input_gate_other(0, 1, 5).unwrap();
        let arith = gmw.make_bit_to_arithmetic_gate::<u64>(&wires[0]);
        gmw.make_arithmetic_output_gate_other::<u64>(&arith, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn beavy_gmw_round_trip_boolean() {
    common::init_tracing();
    let bits = [true, false, true, true, false, false, true, false];

    let (mut b0, mut b1) = connected_backends().await;
    let input_bits = bitvec_from(&bits);
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wires) = beavy.make_boolean_input_gate_my(0, 1, 8).unwrap();
        let as_refs: Vec<WireRef> = wires.iter().cloned().map(WireRef::from).collect();
        let gmw_wires = beavy
            .make_convert(biber::beavy::ProtocolKind::BooleanGmw, &as_refs)
            .unwrap();
        let back = beavy
            .make_convert(biber::beavy::ProtocolKind::BooleanBeavy, &gmw_wires)
            .unwrap();
        let back: Vec<_> = back
            .into_iter()
            .map(|w| match w {
                WireRef::BooleanBeavy(w) => w,
                _ => panic!("expected Boolean BEAVY wire"),
            })
            .collect();
        let out = beavy.make_boolean_output_gate_my(0, &back).unwrap();
        input.set(vec![input_bits]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wires = beavy.make_boolean_input_gate_other(0, 1, 8).unwrap();
        let as_refs: Vec<WireRef> = wires.iter().cloned().map(WireRef::from).collect();
        let gmw_wires = beavy
            .make_convert(biber::beavy::ProtocolKind::BooleanGmw, &as_refs)
            .unwrap();
        let back = beavy
            .make_convert(biber::beavy::ProtocolKind::BooleanBeavy, &gmw_wires)
            .unwrap();
        let back: Vec<_> = back
            .into_iter()
            .map(|w| match w {
                WireRef::BooleanBeavy(w) => w,
                _ => panic!("expected Boolean BEAVY wire"),
            })
            .collect();
        beavy.make_boolean_output_gate_other(0, &back).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(bitvec_from(&bits), res[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn beavy_gmw_round_trip_arithmetic() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wire) = beavy.make_arithmetic_input_gate_my::<u32>(0, 2).unwrap();
        let gmw_wires = beavy
            .make_convert(
                biber::beavy::ProtocolKind::ArithmeticGmw,
                &[WireRef::from(wire)],
            )
            .unwrap();
        let back = beavy
            .make_convert(biber::beavy::ProtocolKind::ArithmeticBeavy, &gmw_wires)
            .unwrap();
        let WireRef::ArithmeticBeavy32(back) = &back[0] else {
            panic!("expected u32 BEAVY wire");
        };
        let out = beavy.make_arithmetic_output_gate::<u32>(back, 0).unwrap();
        input.set(vec![0x1234_5678, 42]).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wire = beavy.make_arithmetic_input_gate_other::<u32>(0, 2).unwrap();
        let gmw_wires = beavy
            .make_convert(
                biber::beavy::ProtocolKind::ArithmeticGmw,
                &[WireRef::from(wire)],
            )
            .unwrap();
        let back = beavy
            .make_convert(biber::beavy::ProtocolKind::ArithmeticBeavy, &gmw_wires)
            .unwrap();
        let WireRef::ArithmeticBeavy32(back) = &back[0] else {
            panic!("expected u32 BEAVY wire");
        };
        beavy.make_arithmetic_output_gate_other::<u32>(back, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(vec![0x1234_5678, 42], res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dpf_gate_equality() {
    common::init_tracing();
    let alpha: u16 = 777;
    let inputs: Vec<u16> = vec![777, 776, 0, 777];
    let expected: Vec<u16> = inputs.iter().map(|&x| (x == alpha) as u16).collect();
    let mut dealer_rng = ChaChaRng::seed_from_u64(99);
    let (keys0, keys1) = deal_dpf_keys::<u16, _>(inputs.len(), alpha, &mut dealer_rng);

    let (mut b0, mut b1) = connected_backends().await;
    let inputs0 = inputs.clone();
    let party0 = async move {
        let gmw = b0.gmw();
        let (input, wire) = gmw.make_arithmetic_input_gate_my::<u16>(0, 4).unwrap();
        let eq = gmw.make_dpf_gate(&wire, alpha, keys0).unwrap();
        let out = gmw.make_arithmetic_output_gate::<u16>(&eq, 0).unwrap();
        input.set(inputs0).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let gmw = b1.gmw();
        let wire = gmw.make_arithmetic_input_gate_other::<u16>(0, 4).unwrap();
        let eq = gmw.make_dpf_gate(&wire, alpha, keys1).unwrap();
        gmw.make_arithmetic_output_gate_other::<u16>(&eq, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ic_gate_interval_membership() {
    common::init_tracing();
    let (p, q): (u16, u16) = (100, 1000);
    let inputs: Vec<u16> = vec![99, 100, 500, 1000, 1001, 40000];
    let expected: Vec<u16> = inputs
        .iter()
        .map(|&x| (p <= x && x <= q) as u16)
        .collect();
    let mut dealer_rng = ChaChaRng::seed_from_u64(123);
    let (keys0, keys1) = deal_ic_keys::<u16, _>(inputs.len(), p, q, &mut dealer_rng);

    let (mut b0, mut b1) = connected_backends().await;
    let inputs0 = inputs.clone();
    let num_simd = inputs.len();
    let party0 = async move {
        let gmw = b0.gmw();
        let (input, wire) = gmw
            .make_arithmetic_input_gate_my::<u16>(0, num_simd)
            .unwrap();
        let member = gmw.make_ic_gate(&wire, p, q, keys0).unwrap();
        let out = gmw.make_arithmetic_output_gate::<u16>(&member, 0).unwrap();
        input.set(inputs0).unwrap();
        b0.run().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let gmw = b1.gmw();
        let wire = gmw
            .make_arithmetic_input_gate_other::<u16>(0, num_simd)
            .unwrap();
        let member = gmw.make_ic_gate(&wire, p, q, keys1).unwrap();
        gmw.make_arithmetic_output_gate_other::<u16>(&member, 0).unwrap();
        b1.run().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(expected, res);
}
