//! Kiln Scheduler
//!
//! Force-trigger definitions and the validation pipeline behind them. A
//! trigger definition describes the parameters an operator may supply when
//! manually forcing a new unit of work; the validator checks a raw parameter
//! map against the definition's field specs and produces either a typed
//! parameter bag or the complete list of field errors.
//!
//! Definitions are registered once at configuration load into a
//! [`TriggerRegistry`] and are read-only afterwards.

mod fields;
mod mechanism;
mod trigger;
mod validation;

pub use fields::{FieldKind, FieldSpec};
pub use mechanism::{BuildsetMechanism, FORCE_SOURCE};
pub use trigger::{
  ConfigError, ForceError, ForceTrigger, TriggerDefinition, TriggerError, TriggerMechanism,
  TriggerRegistry,
};
pub use validation::{
  CollectedValidationError, DEFAULT_OWNER, ParameterBag, ValidationError, validate_params,
  with_default_owner,
};
