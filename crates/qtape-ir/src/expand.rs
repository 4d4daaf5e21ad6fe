//! Tape expansion.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::measurement::Measurement;
use crate::observable::Observable;
use crate::tape::Tape;
use crate::wire::Wire;

/// Predicate deciding whether an entry is kept as-is during expansion.
pub type StopPredicate<'a> = &'a dyn Fn(&Instruction) -> bool;

/// Options for [`Tape::expand`].
#[derive(Clone, Copy)]
pub struct ExpandOptions<'a> {
    /// How many levels of decomposition to apply.
    pub depth: usize,
    /// Entries for which this returns `true` are not expanded.
    pub stop_at: Option<StopPredicate<'a>>,
    /// Rotate non-diagonal observables into the computational basis.
    pub expand_measurements: bool,
}

impl Default for ExpandOptions<'_> {
    fn default() -> Self {
        Self {
            depth: 1,
            stop_at: None,
            expand_measurements: false,
        }
    }
}

impl<'a> ExpandOptions<'a> {
    /// Set the expansion depth.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the stopping predicate.
    #[must_use]
    pub fn with_stop_at(mut self, stop_at: StopPredicate<'a>) -> Self {
        self.stop_at = Some(stop_at);
        self
    }

    /// Enable or disable measurement expansion.
    #[must_use]
    pub fn with_expand_measurements(mut self, expand: bool) -> Self {
        self.expand_measurements = expand;
        self
    }
}

impl fmt::Debug for ExpandOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpandOptions")
            .field("depth", &self.depth)
            .field("stop_at", &self.stop_at.is_some())
            .field("expand_measurements", &self.expand_measurements)
            .finish()
    }
}

/// Output queues of an expansion.
#[derive(Default)]
struct Expansion {
    prep: Vec<Instruction>,
    ops: Vec<Instruction>,
    measurements: Vec<Measurement>,
}

impl Expansion {
    fn keep(&mut self, instr: Instruction) {
        if instr.is_state_prep() {
            self.prep.push(instr);
        } else {
            self.ops.push(instr);
        }
    }

    fn expand(&mut self, instr: Instruction, depth: usize, stop_at: Option<StopPredicate<'_>>) {
        if depth == 0 || stop_at.is_some_and(|stop| stop(&instr)) {
            self.keep(instr);
            return;
        }
        match instr {
            Instruction::Op(op) => match op.decomposition() {
                Some(parts) => {
                    for part in parts {
                        self.expand(Instruction::Op(part), depth - 1, stop_at);
                    }
                }
                None => self.keep(Instruction::Op(op)),
            },
            Instruction::Tape(inner) => {
                for entry in inner.operations() {
                    self.expand(entry.clone(), depth - 1, stop_at);
                }
                self.measurements.extend(inner.measurements().iter().cloned());
            }
        }
    }

    /// Rotate every non-diagonal observable into the computational basis.
    ///
    /// Each wire is rotated at most once, so all measurements touching a wire
    /// must agree on its basis. Identity factors impose no basis.
    fn diagonalize_measurements(&mut self) -> IrResult<()> {
        let mut basis: FxHashMap<Wire, Option<Observable>> = FxHashMap::default();
        let mut rotated: Vec<Observable> = Vec::new();
        for m in &self.measurements {
            let required: Vec<(Wire, Option<Observable>)> = match m.observable() {
                Some(obs) => obs
                    .factors()
                    .into_iter()
                    .filter(|f| !matches!(f, Observable::Identity(_)))
                    .flat_map(|f| {
                        let key = (!f.is_diagonal()).then(|| f.clone());
                        f.wires().into_iter().map(move |w| (w, key.clone()))
                    })
                    .collect(),
                None => m.wires().iter().map(|w| (w.clone(), None)).collect(),
            };
            for (wire, key) in required {
                match basis.get(&wire) {
                    Some(existing) if *existing != key => {
                        return Err(IrError::MeasurementBasisConflict { wire });
                    }
                    Some(_) => {}
                    None => {
                        if let Some(factor) = &key {
                            if !rotated.contains(factor) {
                                self.ops.extend(
                                    factor.diagonalizing_gates()?.into_iter().map(Instruction::Op),
                                );
                                rotated.push(factor.clone());
                            }
                        }
                        basis.insert(wire, key);
                    }
                }
            }
        }

        let measurements = std::mem::take(&mut self.measurements);
        self.measurements = measurements
            .into_iter()
            .map(|m| match m.observable() {
                Some(obs) if !obs.is_diagonal() => Ok(Measurement::diagonalized(
                    m.kind(),
                    m.wires().to_vec(),
                    obs.eigvals()?.to_vec(),
                )),
                _ => Ok(m),
            })
            .collect::<IrResult<_>>()?;
        Ok(())
    }
}

impl Tape {
    /// Expand the tape by decomposing operations and splicing nested tapes.
    ///
    /// The returned tape is independent of `self`, has a freshly computed
    /// parameter table and starts with every parameter trainable.
    pub fn expand(&self, options: &ExpandOptions<'_>) -> IrResult<Tape> {
        let mut out = Expansion::default();
        for entry in self.operations() {
            out.expand(entry.clone(), options.depth, options.stop_at);
        }
        out.measurements.extend(self.measurements().iter().cloned());

        if options.expand_measurements {
            out.diagonalize_measurements()?;
        }

        let mut tape = Tape::new();
        tape.install(out.prep, out.ops, out.measurements);
        Ok(tape)
    }
}
