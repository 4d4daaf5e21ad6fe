//! Queue entries of a tape.

use std::fmt;

use crate::operation::Operation;
use crate::param::Param;
use crate::tape::Tape;
use crate::wire::Wire;

/// An entry in a tape's operation list: a single operation or a nested tape
/// acting as one composite operation.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// A single operation.
    Op(Operation),
    /// A nested tape.
    Tape(Tape),
}

impl Instruction {
    /// Name of the entry. Nested tapes are called `"Tape"`.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Op(op) => op.name(),
            Instruction::Tape(_) => "Tape",
        }
    }

    /// Wires touched by the entry, in first-appearance order.
    pub fn wires(&self) -> Vec<Wire> {
        match self {
            Instruction::Op(op) => op.wires().to_vec(),
            Instruction::Tape(tape) => tape.wires(),
        }
    }

    /// Number of parameters the entry contributes to the enclosing tape.
    pub fn num_params(&self) -> usize {
        match self {
            Instruction::Op(op) => op.params().len(),
            Instruction::Tape(tape) => tape.num_params(),
        }
    }

    /// Current parameter values, in local order.
    pub fn parameters(&self) -> Vec<Param> {
        match self {
            Instruction::Op(op) => op.params().to_vec(),
            Instruction::Tape(tape) => tape.get_parameters(false),
        }
    }

    /// Get the parameter at `local` index.
    pub fn parameter(&self, local: usize) -> Option<Param> {
        match self {
            Instruction::Op(op) => op.params().get(local).cloned(),
            Instruction::Tape(tape) => tape.parameter(local),
        }
    }

    /// Overwrite the parameter at `local` index.
    pub(crate) fn set_parameter(&mut self, local: usize, value: Param) {
        match self {
            Instruction::Op(op) => op.set_param(local, value),
            Instruction::Tape(tape) => tape.set_parameter(local, value),
        }
    }

    /// Check if the entry is a state preparation. A nested tape counts as one
    /// if it prepares a state itself.
    pub fn is_state_prep(&self) -> bool {
        match self {
            Instruction::Op(op) => op.kind().is_state_prep(),
            Instruction::Tape(tape) => tape.num_prep() > 0,
        }
    }

    /// Check if the entry contains anything besides state preparations.
    pub fn has_operations(&self) -> bool {
        match self {
            Instruction::Op(op) => !op.kind().is_state_prep(),
            Instruction::Tape(tape) => tape.operations().iter().any(Instruction::has_operations),
        }
    }

    /// Invert in place. Nested tapes invert recursively.
    pub fn invert(&mut self) {
        match self {
            Instruction::Op(op) => op.invert(),
            Instruction::Tape(tape) => tape.inv(),
        }
    }

    /// Get the operation if this entry is one.
    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Instruction::Op(op) => Some(op),
            Instruction::Tape(_) => None,
        }
    }

    /// Get the nested tape if this entry is one.
    pub fn as_tape(&self) -> Option<&Tape> {
        match self {
            Instruction::Op(_) => None,
            Instruction::Tape(tape) => Some(tape),
        }
    }

    /// Append the operations of this entry to `out`, flattening nested tapes.
    pub fn flatten_into(&self, out: &mut Vec<Operation>) {
        match self {
            Instruction::Op(op) => out.push(op.clone()),
            Instruction::Tape(tape) => {
                for inner in tape.instructions() {
                    inner.flatten_into(out);
                }
            }
        }
    }
}

impl From<Operation> for Instruction {
    fn from(op: Operation) -> Self {
        Instruction::Op(op)
    }
}

impl From<Tape> for Instruction {
    fn from(tape: Tape) -> Self {
        Instruction::Tape(tape)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "{op}"),
            Instruction::Tape(tape) => {
                let wires: Vec<String> = tape.wires().iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "Tape(ops={}, wires=[{}])",
                    tape.instructions().len(),
                    wires.join(", ")
                )
            }
        }
    }
}
