//! Recording scopes.
//!
//! A [`Recorder`] is the handle threaded through a recording closure. Items
//! are queued in call order and only checked once the closure returns, so an
//! observable may be queued before the measurement that binds it.

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::measurement::Measurement;
use crate::observable::Observable;
use crate::tape::Tape;
use crate::wire::Wire;

/// Handle to an observable queued without a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservableHandle(usize);

#[derive(Debug)]
enum QueueItem {
    Op(Instruction),
    /// `None` once bound by a measurement.
    Observable(Option<Observable>),
    Measurement(Measurement),
}

/// Queue of items recorded during one scope.
#[derive(Debug, Default)]
pub struct Recorder {
    queue: Vec<QueueItem>,
    pending: Option<IrError>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue an operation or a nested tape.
    pub fn apply(&mut self, instr: impl Into<Instruction>) -> &mut Self {
        self.queue.push(QueueItem::Op(instr.into()));
        self
    }

    /// Queue an existing tape as a single composite entry.
    pub fn append_tape(&mut self, tape: Tape) -> &mut Self {
        self.apply(tape)
    }

    /// Record a nested tape and queue it as a single composite entry.
    pub fn nested<F>(&mut self, f: F) -> IrResult<&mut Self>
    where
        F: FnOnce(&mut Recorder) -> IrResult<()>,
    {
        let tape = Tape::build(f)?;
        Ok(self.apply(tape))
    }

    /// Queue an observable without a measurement.
    ///
    /// The observable must be bound later with [`expval_of`](Self::expval_of),
    /// [`var_of`](Self::var_of) or [`sample_of`](Self::sample_of); otherwise
    /// the scope fails.
    pub fn observable(&mut self, obs: Observable) -> ObservableHandle {
        self.queue.push(QueueItem::Observable(Some(obs)));
        ObservableHandle(self.queue.len() - 1)
    }

    /// Queue a measurement.
    pub fn measure(&mut self, m: Measurement) -> &mut Self {
        self.queue.push(QueueItem::Measurement(m));
        self
    }

    /// Expectation value of `obs`.
    pub fn expval(&mut self, obs: Observable) -> &mut Self {
        self.measure(Measurement::expval(obs))
    }

    /// Variance of `obs`.
    pub fn var(&mut self, obs: Observable) -> &mut Self {
        self.measure(Measurement::var(obs))
    }

    /// Samples of `obs`.
    pub fn sample(&mut self, obs: Observable) -> &mut Self {
        self.measure(Measurement::sample(obs))
    }

    /// Basis-state probabilities over `wires`.
    pub fn probs(&mut self, wires: impl IntoIterator<Item = impl Into<Wire>>) -> &mut Self {
        self.measure(Measurement::probs(wires))
    }

    /// Expectation value of a previously queued observable.
    pub fn expval_of(&mut self, handle: ObservableHandle) -> &mut Self {
        self.bind(handle, Measurement::expval)
    }

    /// Variance of a previously queued observable.
    pub fn var_of(&mut self, handle: ObservableHandle) -> &mut Self {
        self.bind(handle, Measurement::var)
    }

    /// Samples of a previously queued observable.
    pub fn sample_of(&mut self, handle: ObservableHandle) -> &mut Self {
        self.bind(handle, Measurement::sample)
    }

    fn bind(&mut self, handle: ObservableHandle, wrap: fn(Observable) -> Measurement) -> &mut Self {
        let taken = match self.queue.get_mut(handle.0) {
            Some(QueueItem::Observable(slot)) => slot.take(),
            _ => None,
        };
        match taken {
            Some(obs) => self.queue.push(QueueItem::Measurement(wrap(obs))),
            None => {
                self.pending.get_or_insert_with(|| {
                    IrError::ConstructionOrder(
                        "Observable handle does not refer to an unmeasured observable".to_string(),
                    )
                });
            }
        }
        self
    }

    /// Number of items queued so far.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Validate the queue, appended after the tape's existing contents, and
    /// install the result into `tape`.
    pub(crate) fn commit(self, tape: &mut Tape) -> IrResult<()> {
        if let Some(err) = self.pending {
            return Err(err);
        }

        let mut items: Vec<QueueItem> = tape.operations().iter().cloned().map(QueueItem::Op).collect();
        items.extend(tape.measurements().iter().cloned().map(QueueItem::Measurement));
        items.extend(self.queue);

        let mut prep = Vec::new();
        let mut ops = Vec::new();
        let mut measurements = Vec::new();
        // set once anything but a pure preparation is queued
        let mut sealed = false;
        for item in items {
            match item {
                QueueItem::Op(instr) => {
                    if !measurements.is_empty() {
                        return Err(IrError::ConstructionOrder(format!(
                            "Quantum operation {} must occur prior to any measurements.",
                            instr.name()
                        )));
                    }
                    if instr.is_state_prep() {
                        if sealed {
                            return Err(IrError::ConstructionOrder(format!(
                                "State preparation operation {} must occur prior to any quantum operations.",
                                instr.name()
                            )));
                        }
                        sealed = instr.has_operations();
                        prep.push(instr);
                    } else {
                        sealed = true;
                        ops.push(instr);
                    }
                }
                QueueItem::Observable(Some(obs)) => {
                    return Err(IrError::UnboundObservable { name: obs.name() });
                }
                QueueItem::Observable(None) => {}
                QueueItem::Measurement(m) => measurements.push(m),
            }
        }

        tape.install(prep, ops, measurements);
        Ok(())
    }
}
