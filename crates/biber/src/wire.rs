//! Wires: named holders of shares with two-phase readiness.
//!
//! A BEAVY wire carries a secret-share field (fixed during setup) and a
//! public-share field (fixed during online); GMW wires carry a single
//! additive share fixed during online. The producing gate owns the values
//! until it signals readiness; consumers await the readiness condition and
//! receive a clone. Shares are never mutated after they have been set.

use crate::cell::ShareCell;
use crate::common::BitVec;
use crate::ring::Ring;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId(pub u64);

#[derive(Debug)]
pub struct BooleanBeavyWire {
    id: WireId,
    num_simd: usize,
    secret: ShareCell<BitVec>,
    public: ShareCell<BitVec>,
}

impl BooleanBeavyWire {
    pub(crate) fn new(id: WireId, num_simd: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            num_simd,
            secret: ShareCell::new(),
            public: ShareCell::new(),
        })
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn num_simd(&self) -> usize {
        self.num_simd
    }

    /// Fixes the secret share and fires the setup readiness.
    pub fn set_setup_ready(&self, secret_share: BitVec) {
        assert_eq!(secret_share.len(), self.num_simd, "secret share length");
        self.secret.set(secret_share);
    }

    /// Fixes the public share and fires the online readiness.
    pub fn set_online_ready(&self, public_share: BitVec) {
        assert!(
            self.secret.is_set(),
            "online readiness before setup readiness"
        );
        assert_eq!(public_share.len(), self.num_simd, "public share length");
        self.public.set(public_share);
    }

    /// Waits for the setup phase of the producing gate; returns λ_i.
    pub async fn wait_setup(&self) -> BitVec {
        self.secret.wait().await
    }

    /// Waits for the online phase of the producing gate; returns Δ.
    pub async fn wait_online(&self) -> BitVec {
        self.public.wait().await
    }
}

#[derive(Debug)]
pub struct ArithmeticBeavyWire<T> {
    id: WireId,
    num_simd: usize,
    secret: ShareCell<Vec<T>>,
    public: ShareCell<Vec<T>>,
}

impl<T: Ring> ArithmeticBeavyWire<T> {
    pub(crate) fn new(id: WireId, num_simd: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            num_simd,
            secret: ShareCell::new(),
            public: ShareCell::new(),
        })
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn num_simd(&self) -> usize {
        self.num_simd
    }

    pub fn set_setup_ready(&self, secret_share: Vec<T>) {
        assert_eq!(secret_share.len(), self.num_simd, "secret share length");
        self.secret.set(secret_share);
    }

    pub fn set_online_ready(&self, public_share: Vec<T>) {
        assert!(
            self.secret.is_set(),
            "online readiness before setup readiness"
        );
        assert_eq!(public_share.len(), self.num_simd, "public share length");
        self.public.set(public_share);
    }

    pub async fn wait_setup(&self) -> Vec<T> {
        self.secret.wait().await
    }

    pub async fn wait_online(&self) -> Vec<T> {
        self.public.wait().await
    }
}

#[derive(Debug)]
pub struct BooleanGmwWire {
    id: WireId,
    num_simd: usize,
    share: ShareCell<BitVec>,
}

impl BooleanGmwWire {
    pub(crate) fn new(id: WireId, num_simd: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            num_simd,
            share: ShareCell::new(),
        })
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn num_simd(&self) -> usize {
        self.num_simd
    }

    pub fn set_online_ready(&self, share: BitVec) {
        assert_eq!(share.len(), self.num_simd, "share length");
        self.share.set(share);
    }

    pub async fn wait_online(&self) -> BitVec {
        self.share.wait().await
    }
}

#[derive(Debug)]
pub struct ArithmeticGmwWire<T> {
    id: WireId,
    num_simd: usize,
    share: ShareCell<Vec<T>>,
}

impl<T: Ring> ArithmeticGmwWire<T> {
    pub(crate) fn new(id: WireId, num_simd: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            num_simd,
            share: ShareCell::new(),
        })
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn num_simd(&self) -> usize {
        self.num_simd
    }

    pub fn set_online_ready(&self, share: Vec<T>) {
        assert_eq!(share.len(), self.num_simd, "share length");
        self.share.set(share);
    }

    pub async fn wait_online(&self) -> Vec<T> {
        self.share.wait().await
    }
}

/// Tagged reference to a wire of any protocol and width, used by the
/// dynamic gate-factory API.
#[derive(Clone, Debug)]
pub enum WireRef {
    BooleanBeavy(Arc<BooleanBeavyWire>),
    ArithmeticBeavy8(Arc<ArithmeticBeavyWire<u8>>),
    ArithmeticBeavy16(Arc<ArithmeticBeavyWire<u16>>),
    ArithmeticBeavy32(Arc<ArithmeticBeavyWire<u32>>),
    ArithmeticBeavy64(Arc<ArithmeticBeavyWire<u64>>),
    BooleanGmw(Arc<BooleanGmwWire>),
    ArithmeticGmw8(Arc<ArithmeticGmwWire<u8>>),
    ArithmeticGmw16(Arc<ArithmeticGmwWire<u16>>),
    ArithmeticGmw32(Arc<ArithmeticGmwWire<u32>>),
    ArithmeticGmw64(Arc<ArithmeticGmwWire<u64>>),
}

impl WireRef {
    pub fn num_simd(&self) -> usize {
        match self {
            WireRef::BooleanBeavy(w) => w.num_simd(),
            WireRef::ArithmeticBeavy8(w) => w.num_simd(),
            WireRef::ArithmeticBeavy16(w) => w.num_simd(),
            WireRef::ArithmeticBeavy32(w) => w.num_simd(),
            WireRef::ArithmeticBeavy64(w) => w.num_simd(),
            WireRef::BooleanGmw(w) => w.num_simd(),
            WireRef::ArithmeticGmw8(w) => w.num_simd(),
            WireRef::ArithmeticGmw16(w) => w.num_simd(),
            WireRef::ArithmeticGmw32(w) => w.num_simd(),
            WireRef::ArithmeticGmw64(w) => w.num_simd(),
        }
    }
}

impl From<Arc<BooleanBeavyWire>> for WireRef {
    fn from(wire: Arc<BooleanBeavyWire>) -> Self {
        WireRef::BooleanBeavy(wire)
    }
}

impl From<Arc<BooleanGmwWire>> for WireRef {
    fn from(wire: Arc<BooleanGmwWire>) -> Self {
        WireRef::BooleanGmw(wire)
    }
}

macro_rules! impl_arith_wire_ref {
    ($($t:ty => $beavy:ident, $gmw:ident);+ $(;)?) => {$(
        impl From<Arc<ArithmeticBeavyWire<$t>>> for WireRef {
            fn from(wire: Arc<ArithmeticBeavyWire<$t>>) -> Self {
                WireRef::$beavy(wire)
            }
        }

        impl From<Arc<ArithmeticGmwWire<$t>>> for WireRef {
            fn from(wire: Arc<ArithmeticGmwWire<$t>>) -> Self {
                WireRef::$gmw(wire)
            }
        }
    )+};
}

impl_arith_wire_ref! {
    u8 => ArithmeticBeavy8, ArithmeticGmw8;
    u16 => ArithmeticBeavy16, ArithmeticGmw16;
    u32 => ArithmeticBeavy32, ArithmeticGmw32;
    u64 => ArithmeticBeavy64, ArithmeticGmw64;
}
