//! # Plan Persistence Format
//!
//! Binary serialization for compiled plans.
//!
//! Format: Header (5 bytes) + postcard-serialized plan.
//! - 4 bytes: Magic ("SGFL")
//! - 1 byte: Version
//!
//! ## Validation
//!
//! - Size limits and the header are checked BEFORE decoding the payload
//! - After decoding, every handle is checked against the plan's tables,
//!   so a corrupted file never yields a plan that indexes out of range

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::{CompiledPlan, EventId, NodeKey, SigflowError};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum allowed payload size for the plan format.
///
/// Validated BEFORE attempting deserialization.
pub const MAX_PLAN_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes all plan data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PlanHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), SigflowError> {
        if &self.magic != MAGIC_BYTES {
            return Err(SigflowError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(SigflowError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigflowError> {
        if bytes.len() < HEADER_LEN {
            return Err(SigflowError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PlanHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a plan to bytes (header + payload).
///
/// Deterministic: the same plan always yields the same bytes.
pub fn plan_to_bytes(plan: &CompiledPlan) -> Result<Vec<u8>, SigflowError> {
    let payload =
        postcard::to_stdvec(plan).map_err(|e| SigflowError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PlanHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a plan from bytes.
pub fn plan_from_bytes(bytes: &[u8]) -> Result<CompiledPlan, SigflowError> {
    if bytes.len() < HEADER_LEN {
        return Err(SigflowError::SerializationError(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }

    if bytes.len() > MAX_PLAN_PAYLOAD_SIZE {
        return Err(SigflowError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PLAN_PAYLOAD_SIZE
        )));
    }

    let header = PlanHeader::from_bytes(bytes)?;
    header.validate()?;

    let plan: CompiledPlan = postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        SigflowError::SerializationError(format!("Failed to deserialize plan data: {e}"))
    })?;

    validate_plan(&plan)?;
    Ok(plan)
}

/// Check that every handle in a decoded plan is in range.
fn validate_plan(plan: &CompiledPlan) -> Result<(), SigflowError> {
    let corrupt = |what: &str| SigflowError::SerializationError(format!("Corrupted plan: {what}"));

    let functor_count = plan.functors.len();
    let signal_count = plan.signals.len();

    for (i, functor) in plan.functors.iter().enumerate() {
        if functor.id.index() != i {
            return Err(corrupt("functor ids out of order"));
        }
        if functor.provides.iter().any(|s| s.slot() >= signal_count)
            || functor.consumed_signals().any(|s| s.slot() >= signal_count)
        {
            return Err(corrupt("signal handle out of range"));
        }
    }
    if plan.signals.iter().any(|s| s.producer.index() >= functor_count)
        || plan.events.iter().any(|f| f.index() >= functor_count)
    {
        return Err(corrupt("functor handle out of range"));
    }

    // Events and impure functors are a bijection, numbered by position
    if plan.functors.iter().any(|f| f.event.is_some() == f.is_pure)
        || plan.functors.iter().filter(|f| f.event.is_some()).count() != plan.events.len()
    {
        return Err(corrupt("event table does not match functor purity"));
    }
    for (i, f) in plan.events.iter().enumerate() {
        let expected = u32::try_from(i).ok().map(EventId);
        if plan.functors.get(f.index()).map(|f| f.event) != Some(expected) {
            return Err(corrupt("event table does not match functor events"));
        }
    }

    if plan.functor_index.len() != functor_count
        || plan
            .functor_index
            .iter()
            .any(|(name, id)| plan.functors.get(id.index()).is_none_or(|f| &f.name != name))
    {
        return Err(corrupt("functor index does not match functor table"));
    }
    if plan.signal_index.len() != signal_count
        || plan
            .signal_index
            .iter()
            .any(|(name, slot)| plan.signals.get(slot.slot()).is_none_or(|s| &s.name != name))
    {
        return Err(corrupt("signal index does not match signal table"));
    }

    for (i, layer) in plan.layers.iter().enumerate() {
        if layer.index != i {
            return Err(corrupt("layer indices out of order"));
        }
        let node_ok = |key: &NodeKey| match *key {
            NodeKey::Signal(s) => s.slot() < signal_count,
            NodeKey::Event(f) => f.index() < functor_count,
        };
        if !layer.nodes.iter().all(node_ok) {
            return Err(corrupt("node handle out of range"));
        }
        for step in &layer.steps {
            if step.functor.index() >= functor_count
                || step
                    .marks
                    .iter()
                    .chain(step.trigger.changed.iter())
                    .any(|s| s.slot() >= signal_count)
            {
                return Err(corrupt("step handle out of range"));
            }
        }
    }
    Ok(())
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// Deterministic 64-bit checksum of a plan (FNV-1a over its bytes).
pub fn plan_checksum(plan: &CompiledPlan) -> Result<u64, SigflowError> {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let bytes = plan_to_bytes(plan)?;
    Ok(bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME)))
}

/// BLAKE3 hash of a plan's bytes, as lowercase hex.
#[cfg(feature = "crypto-hash")]
pub fn plan_hash(plan: &CompiledPlan) -> Result<String, SigflowError> {
    let bytes = plan_to_bytes(plan)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
