//! Correlation tests for the MT/SP/SB pool providers.

mod common;

use common::connected_backends;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn boolean_mul_triples_correlate() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let count = 512;
    let mt0 = b0.mt_provider();
    let mt1 = b1.mt_provider();
    assert_eq!(0, mt0.request_bool_mts(count));
    assert_eq!(0, mt1.request_bool_mts(count));

    let (r0, r1) = tokio::join!(b0.run_preprocessing(), b1.run_preprocessing());
    r0.unwrap();
    r1.unwrap();

    let t0 = mt0.bool_mts(0, count);
    let t1 = mt1.bool_mts(0, count);
    let a = t0.a ^ t1.a.as_bitslice();
    let b = t0.b ^ t1.b.as_bitslice();
    let c = t0.c ^ t1.c.as_bitslice();
    assert_eq!(c, a & b.as_bitslice());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn arithmetic_mul_triples_correlate() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let count = 64;
    let mt0 = b0.mt_provider();
    let mt1 = b1.mt_provider();
    mt0.request_ring_mts::<u64>(count);
    mt1.request_ring_mts::<u64>(count);

    let (r0, r1) = tokio::join!(b0.run_preprocessing(), b1.run_preprocessing());
    r0.unwrap();
    r1.unwrap();

    let t0 = mt0.ring_mts::<u64>(0, count);
    let t1 = mt1.ring_mts::<u64>(0, count);
    for i in 0..count {
        let a = t0.a[i].wrapping_add(t1.a[i]);
        let b = t0.b[i].wrapping_add(t1.b[i]);
        let c = t0.c[i].wrapping_add(t1.c[i]);
        assert_eq!(a.wrapping_mul(b), c, "triple {i}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn square_pairs_correlate() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let count = 64;
    let sp0 = b0.sp_provider();
    let sp1 = b1.sp_provider();
    sp0.request_sps::<u32>(count);
    sp1.request_sps::<u32>(count);

    let (r0, r1) = tokio::join!(b0.run_preprocessing(), b1.run_preprocessing());
    r0.unwrap();
    r1.unwrap();

    let p0 = sp0.sps::<u32>(0, count);
    let p1 = sp1.sps::<u32>(0, count);
    for i in 0..count {
        let a = p0.a[i].wrapping_add(p1.a[i]);
        let c = p0.c[i].wrapping_add(p1.c[i]);
        assert_eq!(a.wrapping_mul(a), c, "pair {i}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_bits_correlate() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let count = 256;
    let sb0 = b0.sb_provider();
    let sb1 = b1.sb_provider();
    sb0.request_sbs::<u16>(count);
    sb1.request_sbs::<u16>(count);

    let (r0, r1) = tokio::join!(b0.run_preprocessing(), b1.run_preprocessing());
    r0.unwrap();
    r1.unwrap();

    let s0 = sb0.sbs::<u16>(0, count);
    let s1 = sb1.sbs::<u16>(0, count);
    for i in 0..count {
        let bit = s0.bool_share[i] ^ s1.bool_share[i];
        let arith = s0.arith_share[i].wrapping_add(s1.arith_share[i]);
        assert_eq!(bit as u16, arith, "shared bit {i}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_fence() {
    common::init_tracing();
    let (mut b0, mut b1) = connected_backends().await;
    let p0 = async {
        b0.sync().await.unwrap();
        b0.sync().await.unwrap();
    };
    let p1 = async {
        b1.sync().await.unwrap();
        b1.sync().await.unwrap();
    };
    tokio::join!(p0, p1);
}
