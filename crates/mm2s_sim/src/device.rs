//! The boundary to the device under verification.

use crate::signals::{DeviceInputs, DeviceOutputs};

/// A cycle-evaluated device model seen only through its pins.
///
/// The engine calls [`eval`](Device::eval) after every sub-step and after each
/// clock edge. Implementations detect rising clock edges themselves (by
/// comparing `input.clk` with the value seen at the previous evaluation),
/// update registered state only on those edges, and always recompute
/// `output` from the current state and inputs. Evaluating twice with the same
/// inputs must be idempotent.
pub trait Device {
    /// Evaluates the device, writing its outputs.
    fn eval(&mut self, input: &DeviceInputs, output: &mut DeviceOutputs);

    /// Called exactly once when the owning engine is torn down.
    fn finalize(&mut self) {}
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn eval(&mut self, input: &DeviceInputs, output: &mut DeviceOutputs) {
        (**self).eval(input, output)
    }

    fn finalize(&mut self) {
        (**self).finalize()
    }
}
