//! Device abstraction layer for quantum tapes.
//!
//! This crate defines the interface between tapes and the devices that run
//! them, so that the gradient engine can stay agnostic of how results are
//! produced.
//!
//! # Overview
//!
//! - A common [`Device`] trait for executing tapes and, optionally,
//!   computing Jacobians natively
//! - [`StatevectorAccess`] for simulators that expose their internal state
//! - [`Capabilities`] to describe supported operations, observables and
//!   features
//! - [`DeviceConfig`] and [`DeviceFactory`] for constructing devices from
//!   configuration
//!
//! # Implementing a Custom Device
//!
//! ```ignore
//! use ndarray::Array1;
//! use qtape_hal::{Capabilities, Device, HalResult};
//! use qtape_ir::Tape;
//!
//! struct ConstantDevice {
//!     caps: Capabilities,
//! }
//!
//! impl Device for ConstantDevice {
//!     fn name(&self) -> &str {
//!         "constant"
//!     }
//!
//!     fn capabilities(&self) -> &Capabilities {
//!         &self.caps
//!     }
//!
//!     fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
//!         Ok(tape.measurements().iter().map(|_| Array1::zeros(1)).collect())
//!     }
//! }
//! ```

pub mod capability;
pub mod config;
pub mod device;
pub mod error;

pub use capability::{Capabilities, FEATURE_JACOBIAN, FEATURE_STATEVECTOR, GateSet};
pub use config::{DeviceConfig, DeviceFactory};
pub use device::{Device, StatevectorAccess};
pub use error::{HalError, HalResult};
