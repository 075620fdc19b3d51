//! Target specifications: what the agent is told to go to, and how an abstract
//! specification collapses into a concrete criterion at the start of an episode.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ObjectColor, ObjectDescriptor, ObjectKind};

/// Raised when a target string is not one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown target '{value}', expected one of: {valid}", valid = valid_targets().join(", "))]
pub struct InvalidTarget {
    pub value: String,
}

/// Every string accepted by [`TargetSpec::from_str`], in canonical order.
pub fn valid_targets() -> Vec<&'static str> {
    let mut valid = vec!["random", "random_color", "random_type"];
    valid.extend(ObjectColor::ALL.iter().map(|color| color.as_str()));
    valid.extend(ObjectKind::ALL.iter().map(|kind| kind.as_str()));
    valid
}

/// The configured target criterion, possibly still randomized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetSpec {
    /// Picks between [`TargetSpec::RandomColor`] and [`TargetSpec::RandomType`] each episode.
    #[default]
    Random,
    RandomColor,
    RandomType,
    Color(ObjectColor),
    Kind(ObjectKind),
}

impl TargetSpec {
    /// Collapses the specification into a concrete criterion for one episode.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> ResolvedTarget {
        match self {
            TargetSpec::Random => {
                if rng.random_range(0..2) == 0 {
                    TargetSpec::RandomColor.resolve(rng)
                } else {
                    TargetSpec::RandomType.resolve(rng)
                }
            }
            TargetSpec::RandomColor => ResolvedTarget::Color(
                ObjectColor::ALL[rng.random_range(0..ObjectColor::ALL.len())],
            ),
            TargetSpec::RandomType => {
                ResolvedTarget::Kind(ObjectKind::ALL[rng.random_range(0..ObjectKind::ALL.len())])
            }
            TargetSpec::Color(color) => ResolvedTarget::Color(color),
            TargetSpec::Kind(kind) => ResolvedTarget::Kind(kind),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSpec::Random => "random",
            TargetSpec::RandomColor => "random_color",
            TargetSpec::RandomType => "random_type",
            TargetSpec::Color(color) => color.as_str(),
            TargetSpec::Kind(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetSpec {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(TargetSpec::Random),
            "random_color" => Ok(TargetSpec::RandomColor),
            "random_type" => Ok(TargetSpec::RandomType),
            other => other
                .parse::<ObjectColor>()
                .map(TargetSpec::Color)
                .or_else(|_| other.parse::<ObjectKind>().map(TargetSpec::Kind))
                .map_err(|_| InvalidTarget {
                    value: other.to_string(),
                }),
        }
    }
}

impl TryFrom<String> for TargetSpec {
    type Error = InvalidTarget;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetSpec> for String {
    fn from(spec: TargetSpec) -> Self {
        spec.as_str().to_string()
    }
}

/// A concrete criterion active for the whole episode: either a color or a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedTarget {
    Color(ObjectColor),
    Kind(ObjectKind),
}

impl ResolvedTarget {
    /// True if `descriptor` satisfies the criterion in its matched dimension.
    pub fn matches(&self, descriptor: &ObjectDescriptor) -> bool {
        match *self {
            ResolvedTarget::Color(color) => descriptor.color == color,
            ResolvedTarget::Kind(kind) => descriptor.kind == kind,
        }
    }

    /// Overwrites the matched dimension of `descriptor` so that it satisfies the criterion.
    pub fn force_onto(&self, descriptor: ObjectDescriptor) -> ObjectDescriptor {
        match *self {
            ResolvedTarget::Color(color) => ObjectDescriptor { color, ..descriptor },
            ResolvedTarget::Kind(kind) => ObjectDescriptor { kind, ..descriptor },
        }
    }
}
