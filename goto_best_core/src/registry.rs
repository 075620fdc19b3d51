//! Named environment variants.

use crate::{
    ObjectColor, ObjectKind,
    environment::{ConfigError, EnvConfig, GoToBestEnv},
    target::TargetSpec,
};

/// One registered variant: its id and the configuration it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub id: &'static str,
    pub config: EnvConfig,
}

const fn seven_by_seven(target: TargetSpec) -> EnvConfig {
    EnvConfig {
        grid_size: 7,
        object_count: 3,
        target,
    }
}

/// Every 7x7, three-object variant, keyed by what the target is.
pub const VARIANTS: &[Variant] = &[
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Red-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Red)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Green-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Green)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Blue-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Blue)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Purple-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Purple)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Yellow-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Yellow)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Grey-v0",
        config: seven_by_seven(TargetSpec::Color(ObjectColor::Grey)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Ball-v0",
        config: seven_by_seven(TargetSpec::Kind(ObjectKind::Ball)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Key-v0",
        config: seven_by_seven(TargetSpec::Kind(ObjectKind::Key)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Box-v0",
        config: seven_by_seven(TargetSpec::Kind(ObjectKind::Box)),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Random-v0",
        config: seven_by_seven(TargetSpec::Random),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Color-v0",
        config: seven_by_seven(TargetSpec::RandomColor),
    },
    Variant {
        id: "MiniGrid-GoToBest-7x7-N3-Type-v0",
        config: seven_by_seven(TargetSpec::RandomType),
    },
];

pub fn ids() -> impl Iterator<Item = &'static str> {
    VARIANTS.iter().map(|variant| variant.id)
}

pub fn lookup(id: &str) -> Result<EnvConfig, ConfigError> {
    VARIANTS
        .iter()
        .find(|variant| variant.id == id)
        .map(|variant| variant.config)
        .ok_or_else(|| ConfigError::UnknownEnvironment { id: id.to_string() })
}

/// Builds the registered environment `id` with its own seeded random source.
pub fn make(id: &str, seed: u64) -> Result<GoToBestEnv, ConfigError> {
    GoToBestEnv::new(lookup(id)?, seed)
}
