//! Exact and similar type matching, and the coercions they imply
//!
//! An exact match is a candidate assignable to the target as-is: the same
//! declared type, or a declared capability for the target. A similar match is
//! a shape mismatch only: the target wants `Arc<T>` and the candidate is a
//! bare `T`, or the other way round.

use crate::error::{DiError, DiResult};
use crate::types::{CastFn, Instance, ShapeFn, TypeInfo};

/// How a matched instance is turned into the target type
#[derive(Clone)]
pub(crate) enum Conversion {
    Identity,
    Capability(CastFn),
    /// Bare `T` into `Arc<T>`
    Share(ShapeFn),
    /// `Arc<T>` into bare `T`
    Unshare(ShapeFn),
}

/// Classification of a candidate against a target
#[derive(Clone)]
pub(crate) enum Match {
    Exact(Conversion),
    Similar(Conversion),
}

/// Classify `candidate` against `target`, preferring exact matches
pub(crate) fn classify(target: &TypeInfo, candidate: &TypeInfo) -> Option<Match> {
    if candidate.key == target.key {
        return Some(Match::Exact(Conversion::Identity));
    }

    if let Some(capability) = candidate
        .capabilities
        .iter()
        .find(|capability| capability.key == target.key)
    {
        return Some(Match::Exact(Conversion::Capability(capability.cast.clone())));
    }

    if candidate.shared == target.key {
        return Some(Match::Similar(Conversion::Share(candidate.share)));
    }

    if target.shared == candidate.key {
        if let Some(unshare) = target.unshare {
            return Some(Match::Similar(Conversion::Unshare(unshare)));
        }
    }

    None
}

/// Whether `candidate` is assignable to `target` as-is
pub fn is_exact_match(target: &TypeInfo, candidate: &TypeInfo) -> bool {
    matches!(classify(target, candidate), Some(Match::Exact(_)))
}

/// Whether `candidate` differs from `target` only by `Arc` shape
pub fn is_similar_match(target: &TypeInfo, candidate: &TypeInfo) -> bool {
    matches!(classify(target, candidate), Some(Match::Similar(_)))
}

/// Convert a resolved candidate instance into the target type
pub(crate) fn coerce(
    target: &TypeInfo,
    candidate: &TypeInfo,
    instance: Instance,
    conversion: &Conversion,
) -> DiResult<Instance> {
    let converted = match conversion {
        Conversion::Identity => Some(instance),
        Conversion::Capability(cast) => cast(&instance),
        Conversion::Share(convert) | Conversion::Unshare(convert) => convert(&instance),
    };

    converted.ok_or(DiError::TypeMismatch {
        expected: target.name(),
        found: candidate.name(),
    })
}
