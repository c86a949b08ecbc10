//! Scheduler-level tests: sequential evaluation, the dynamic operation
//! factory and backend reuse after `clear`.

mod common;

use biber::beavy::{BinaryOp, ProtocolKind, UnaryOp};
use biber::common::BitVec;
use biber::wire::WireRef;
use common::connected_backends;

fn bitvec_from(bits: &[bool]) -> BitVec {
    bits.iter().copied().collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_evaluation() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, a) = beavy.make_arithmetic_input_gate_my::<u16>(0, 2).unwrap();
        let b = beavy.make_arithmetic_input_gate_other::<u16>(1, 2).unwrap();
        let y = beavy.make_mul_gate(&a, &b).unwrap();
        let out = beavy.make_arithmetic_output_gate::<u16>(&y, 0).unwrap();
        input.set(vec![6, 9]).unwrap();
        b0.run_preprocessing().await.unwrap();
        b0.evaluate_sequential().await.unwrap();
        out.get().await.unwrap()
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let a = beavy.make_arithmetic_input_gate_other::<u16>(0, 2).unwrap();
        let (input, b) = beavy.make_arithmetic_input_gate_my::<u16>(1, 2).unwrap();
        let y = beavy.make_mul_gate(&a, &b).unwrap();
        beavy.make_arithmetic_output_gate_other::<u16>(&y, 0).unwrap();
        input.set(vec![7, 11]).unwrap();
        b1.run_preprocessing().await.unwrap();
        b1.evaluate_sequential().await.unwrap();
    };
    let (res, ()) = tokio::join!(party0, party1);
    assert_eq!(vec![42, 99], res);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dynamic_operation_factory() {
    common::init_tracing();
    let bits = [true, true, false, true, false, false, true, true];
    let expected_ham = bits.iter().filter(|&&b| b).count() as u64;

    let (mut b0, mut b1) = connected_backends().await;
    let input_bits = bits.iter().map(|&b| bitvec_from(&[b])).collect::<Vec<_>>();
    let party0 = async move {
        let beavy = b0.beavy();
        let (input, wires) = beavy.make_boolean_input_gate_my(0, 8, 1).unwrap();
        let refs: Vec<WireRef> = wires.iter().cloned().map(WireRef::from).collect();
        // x ^ x == 0, then Hamming weight over the original wires
        let zeros = beavy.make_binary_gate(BinaryOp::Xor, &refs, &refs).unwrap();
        let ham = beavy.make_unary_gate(UnaryOp::Ham, &refs).unwrap();
        let [WireRef::ArithmeticBeavy64(ham_wire)] = &ham[..] else {
            panic!("HAM must produce a u64 wire");
        };
        let neg = beavy
            .make_unary_gate(UnaryOp::Neg, std::slice::from_ref(&ham[0]))
            .unwrap();
        let [WireRef::ArithmeticBeavy64(neg_wire)] = &neg[..] else {
            panic!("NEG must produce a u64 wire");
        };
        let zero_wires: Vec<_> = zeros
            .into_iter()
            .map(|w| match w {
                WireRef::BooleanBeavy(w) => w,
                _ => panic!("expected Boolean BEAVY wires"),
            })
            .collect();
        let out_zero = beavy.make_boolean_output_gate_my(0, &zero_wires).unwrap();
        let out_ham = beavy.make_arithmetic_output_gate::<u64>(ham_wire, 0).unwrap();
        let out_neg = beavy.make_arithmetic_output_gate::<u64>(neg_wire, 0).unwrap();
        input.set(input_bits).unwrap();
        b0.run().await.unwrap();
        (
            out_zero.get().await.unwrap(),
            out_ham.get().await.unwrap(),
            out_neg.get().await.unwrap(),
        )
    };
    let party1 = async move {
        let beavy = b1.beavy();
        let wires = beavy.make_boolean_input_gate_other(0, 8, 1).unwrap();
        let refs: Vec<WireRef> = wires.iter().cloned().map(WireRef::from).collect();
        let zeros = beavy.make_binary_gate(BinaryOp::Xor, &refs, &refs).unwrap();
        let ham = beavy.make_unary_gate(UnaryOp::Ham, &refs).unwrap();
        let [WireRef::ArithmeticBeavy64(ham_wire)] = &ham[..] else {
            panic!("HAM must produce a u64 wire");
        };
        let neg = beavy
            .make_unary_gate(UnaryOp::Neg, std::slice::from_ref(&ham[0]))
            .unwrap();
        let [WireRef::ArithmeticBeavy64(neg_wire)] = &neg[..] else {
            panic!("NEG must produce a u64 wire");
        };
        let zero_wires: Vec<_> = zeros
            .into_iter()
            .map(|w| match w {
                WireRef::BooleanBeavy(w) => w,
                _ => panic!("expected Boolean BEAVY wires"),
            })
            .collect();
        beavy.make_boolean_output_gate_other(0, &zero_wires).unwrap();
        beavy
            .make_arithmetic_output_gate_other::<u64>(ham_wire, 0)
            .unwrap();
        beavy
            .make_arithmetic_output_gate_other::<u64>(neg_wire, 0)
            .unwrap();
        b1.run().await.unwrap();
    };
    let ((zeros, ham, neg), ()) = tokio::join!(party0, party1);
    assert!(zeros.iter().all(|w| !w[0]));
    assert_eq!(vec![expected_ham], ham);
    assert_eq!(vec![expected_ham.wrapping_neg()], neg);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsupported_dynamic_op_is_rejected() {
    common::init_tracing();
    let (b0, _b1) = connected_backends().await;
    let beavy = b0.beavy();
    let (_input, wire) = beavy.make_arithmetic_input_gate_my::<u32>(0, 1).unwrap();
    let refs = [WireRef::from(wire)];
    // Boolean op on an arithmetic wire
    assert!(beavy.make_binary_gate(BinaryOp::Xor, &refs, &refs).is_err());
    assert!(beavy.make_unary_gate(UnaryOp::Inv, &refs).is_err());
    assert!(beavy
        .make_convert(ProtocolKind::BooleanGmw, &refs)
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_allows_a_fresh_evaluation() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let party = |mut backend: biber::Backend, value: u32| async move {
        for round in 0..2u32 {
            let beavy = backend.beavy();
            let (plain, out) = if backend.my_id() == 0 {
                let (input, wire) = beavy.make_arithmetic_input_gate_my::<u32>(0, 1).unwrap();
                input.set(vec![value + round]).unwrap();
                let neg = beavy.make_neg_gate(&wire);
                (
                    Some(value + round),
                    Some(beavy.make_arithmetic_output_gate::<u32>(&neg, 0).unwrap()),
                )
            } else {
                let wire = beavy
                    .make_arithmetic_input_gate_other::<u32>(0, 1)
                    .unwrap();
                let neg = beavy.make_neg_gate(&wire);
                beavy
                    .make_arithmetic_output_gate_other::<u32>(&neg, 0)
                    .unwrap();
                (None, None)
            };
            backend.run().await.unwrap();
            if let (Some(plain), Some(out)) = (plain, out) {
                assert_eq!(vec![plain.wrapping_neg()], out.get().await.unwrap());
            }
            backend.clear();
        }
    };
    tokio::join!(party(b0, 1000), party(b1, 0));
}
