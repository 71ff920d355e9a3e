use core::fmt;

/// Memory order requested by a caller at runtime.
///
/// The discriminants follow the `__ATOMIC_*` numbering so the emitted
/// dispatch can take a plain `i32`. `Consume` is kept as its own value but is
/// treated as an alias of `Acquire` everywhere: no dependency ordering is
/// modelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MemoryOrder {
    Relaxed = 0,
    Consume = 1,
    Acquire = 2,
    Release = 3,
    AcqRel = 4,
    SeqCst = 5,
}

/// Which halves of the lattice an order provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Strength {
    pub acquire: bool,
    pub release: bool,
    pub seq_cst: bool,
}

impl Strength {
    #[inline(always)]
    pub fn covers(&self, other: &Strength) -> bool {
        (self.acquire || !other.acquire)
            && (self.release || !other.release)
            && (self.seq_cst || !other.seq_cst)
    }

    #[inline(always)]
    pub fn join(&self, other: &Strength) -> Strength {
        Strength {
            acquire: self.acquire || other.acquire,
            release: self.release || other.release,
            seq_cst: self.seq_cst || other.seq_cst,
        }
    }
}

impl MemoryOrder {
    pub const ALL: [MemoryOrder; 6] = [
        MemoryOrder::Relaxed,
        MemoryOrder::Consume,
        MemoryOrder::Acquire,
        MemoryOrder::Release,
        MemoryOrder::AcqRel,
        MemoryOrder::SeqCst,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.raw() == raw)
    }

    #[inline(always)]
    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Consume => "consume",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::AcqRel => "acq_rel",
            Self::SeqCst => "seq_cst",
        }
    }

    /// Name of the constant in the emitted `memorder` module.
    pub fn const_name(self) -> &'static str {
        match self {
            Self::Relaxed => "RELAXED",
            Self::Consume => "CONSUME",
            Self::Acquire => "ACQUIRE",
            Self::Release => "RELEASE",
            Self::AcqRel => "ACQ_REL",
            Self::SeqCst => "SEQ_CST",
        }
    }

    /// Folds `Consume` onto `Acquire`.
    #[inline(always)]
    pub fn canonical(self) -> Self {
        match self {
            Self::Consume => Self::Acquire,
            other => other,
        }
    }

    pub fn strength(self) -> Strength {
        match self.canonical() {
            Self::Relaxed | Self::Consume => Strength::default(),
            Self::Acquire => Strength {
                acquire: true,
                ..Strength::default()
            },
            Self::Release => Strength {
                release: true,
                ..Strength::default()
            },
            Self::AcqRel => Strength {
                acquire: true,
                release: true,
                seq_cst: false,
            },
            Self::SeqCst => Strength {
                acquire: true,
                release: true,
                seq_cst: true,
            },
        }
    }

    /// `true` when `self` is at least as strong as `other` on the ladder.
    pub fn dominates(self, other: MemoryOrder) -> bool {
        self.strength().covers(&other.strength())
    }

    /// Combined strength of a compare-and-swap's success and failure orders:
    /// the weakest canonical order that dominates both. Acquire joined with
    /// release gives acq_rel, so neither guarantee is dropped.
    pub fn stronger(success: MemoryOrder, failure: MemoryOrder) -> MemoryOrder {
        let joined = success.strength().join(&failure.strength());
        Self::from_strength(joined)
    }

    fn from_strength(strength: Strength) -> MemoryOrder {
        match (strength.acquire, strength.release, strength.seq_cst) {
            (_, _, true) => Self::SeqCst,
            (true, true, false) => Self::AcqRel,
            (true, false, false) => Self::Acquire,
            (false, true, false) => Self::Release,
            (false, false, false) => Self::Relaxed,
        }
    }
}

impl fmt::Display for MemoryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordering semantics a single native instruction can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Semantics {
    Relaxed,
    Acquire,
    Release,
    AcqRel,
}

impl Semantics {
    pub const ALL: [Semantics; 4] = [
        Semantics::Relaxed,
        Semantics::Acquire,
        Semantics::Release,
        Semantics::AcqRel,
    ];

    /// PTX `.sem` qualifier.
    pub fn qualifier(self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::AcqRel => "acq_rel",
        }
    }

    pub fn strength(self) -> Strength {
        match self {
            Self::Relaxed => MemoryOrder::Relaxed.strength(),
            Self::Acquire => MemoryOrder::Acquire.strength(),
            Self::Release => MemoryOrder::Release.strength(),
            Self::AcqRel => MemoryOrder::AcqRel.strength(),
        }
    }
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualifier())
    }
}
