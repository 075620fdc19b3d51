//! Per-episode layout generation: one object matching the target criterion,
//! the rest guaranteed not to, all pairwise distinct.

use rand::Rng;
use serde::Serialize;

use crate::{
    ObjectColor, ObjectDescriptor, ObjectKind, Position,
    target::{ResolvedTarget, TargetSpec},
    world::{World, WorldError},
};

/// The target is always the first object generated.
pub const TARGET_INDEX: usize = 0;

/// Upper bound on candidate draws per episode before generation gives up.
pub const MAX_CANDIDATE_DRAWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error(
        "Could not generate {requested} distinct objects for target {target:?} \
         ({placed} placed after {draws} draws); lower the object count"
    )]
    Unsatisfiable {
        requested: usize,
        placed: usize,
        draws: usize,
        target: ResolvedTarget,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Grid size, step budget and object count for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub max_steps: usize,
    pub object_count: usize,
}

/// The immutable layout of one episode.
///
/// Only built by [`populate`], so the target slot always exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    objects: Vec<ObjectDescriptor>,
    positions: Vec<Position>,
    target: ResolvedTarget,
    mission: String,
}

impl Scenario {
    /// Assembles a scenario from index-aligned objects and positions, target first.
    pub(crate) fn from_parts(
        objects: Vec<ObjectDescriptor>,
        positions: Vec<Position>,
        target: ResolvedTarget,
    ) -> Scenario {
        debug_assert_eq!(objects.len(), positions.len());
        let mission = match objects.get(TARGET_INDEX) {
            Some(descriptor) => format!("go to the {descriptor}"),
            None => String::new(),
        };
        Scenario {
            objects,
            positions,
            target,
            mission,
        }
    }

    pub fn objects(&self) -> &[ObjectDescriptor] {
        &self.objects
    }

    /// Index-aligned with [`Scenario::objects`].
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// The resolved criterion this episode was generated for.
    pub fn target(&self) -> ResolvedTarget {
        self.target
    }

    pub fn target_descriptor(&self) -> ObjectDescriptor {
        self.objects[TARGET_INDEX]
    }

    pub fn target_position(&self) -> Position {
        self.positions[TARGET_INDEX]
    }

    /// Every object other than the target, with its position.
    pub fn distractors(&self) -> impl Iterator<Item = (ObjectDescriptor, Position)> + '_ {
        self.objects
            .iter()
            .copied()
            .zip(self.positions.iter().copied())
            .skip(TARGET_INDEX + 1)
    }

    /// "go to the <color> <type>".
    pub fn mission(&self) -> &str {
        &self.mission
    }
}

/// How many objects `spec` can always accommodate: the target plus every
/// (type, color) pair that does not match it.
pub fn max_object_count(spec: TargetSpec) -> usize {
    let kinds = ObjectKind::ALL.len();
    let colors = ObjectColor::ALL.len();
    let by_kind = 1 + (kinds - 1) * colors;
    let by_color = 1 + kinds * (colors - 1);
    match spec {
        TargetSpec::Kind(_) | TargetSpec::RandomType => by_kind,
        TargetSpec::Color(_) | TargetSpec::RandomColor => by_color,
        TargetSpec::Random => by_kind.min(by_color),
    }
}

fn draw_candidate<R: Rng + ?Sized>(rng: &mut R) -> ObjectDescriptor {
    let kind = ObjectKind::ALL[rng.random_range(0..ObjectKind::ALL.len())];
    let color = ObjectColor::ALL[rng.random_range(0..ObjectColor::ALL.len())];
    ObjectDescriptor::new(kind, color)
}

/// Generates and places `object_count` objects into `world` for `target`.
///
/// The first accepted object is forced to satisfy `target`; later candidates that
/// satisfy it, or that repeat an accepted (type, color) pair, are redrawn.
pub fn populate<R: Rng + ?Sized>(
    world: &mut World,
    object_count: usize,
    target: ResolvedTarget,
    rng: &mut R,
) -> Result<Scenario, GenerationError> {
    let mut objects: Vec<ObjectDescriptor> = Vec::with_capacity(object_count);
    let mut positions = Vec::with_capacity(object_count);
    let mut draws = 0;

    while objects.len() < object_count {
        if draws == MAX_CANDIDATE_DRAWS {
            return Err(GenerationError::Unsatisfiable {
                requested: object_count,
                placed: objects.len(),
                draws,
                target,
            });
        }
        draws += 1;

        let mut candidate = draw_candidate(rng);
        if objects.len() == TARGET_INDEX {
            candidate = target.force_onto(candidate);
        } else if target.matches(&candidate) {
            continue;
        }
        if objects.contains(&candidate) {
            continue;
        }

        let pos = world.place_object(rng, candidate)?;
        objects.push(candidate);
        positions.push(pos);
    }

    Ok(Scenario::from_parts(objects, positions, target))
}

/// Builds a walled world, fills it for `target` and drops the agent in.
pub fn generate<R: Rng + ?Sized>(
    layout: &Layout,
    target: ResolvedTarget,
    rng: &mut R,
) -> Result<(World, Scenario), GenerationError> {
    let mut world = World::new(layout.width, layout.height, layout.max_steps);
    world
        .wall_rect(0, 0, layout.width, layout.height)
        .map_err(WorldError::from)?;

    let scenario = populate(&mut world, layout.object_count, target, rng)?;
    world.place_agent(rng)?;

    Ok((world, scenario))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn layout(size: usize, object_count: usize) -> Layout {
        Layout {
            width: size,
            height: size,
            max_steps: 5 * size * size,
            object_count,
        }
    }

    fn all_targets() -> Vec<ResolvedTarget> {
        ObjectKind::ALL
            .into_iter()
            .map(ResolvedTarget::Kind)
            .chain(ObjectColor::ALL.into_iter().map(ResolvedTarget::Color))
            .collect()
    }

    #[test]
    fn exactly_one_object_matches_the_target() {
        let mut rng = StdRng::seed_from_u64(42);
        for target in all_targets() {
            for count in 1..=6 {
                let (_, scenario) = generate(&layout(7, count), target, &mut rng).unwrap();
                let matching: Vec<usize> = scenario
                    .objects()
                    .iter()
                    .enumerate()
                    .filter(|(_, object)| target.matches(object))
                    .map(|(index, _)| index)
                    .collect();
                assert_eq!(matching, vec![TARGET_INDEX], "{target:?} with {count} objects");
            }
        }
    }

    #[test]
    fn objects_are_pairwise_distinct_and_aligned_with_positions() {
        let mut rng = StdRng::seed_from_u64(9);
        for target in all_targets() {
            let (world, scenario) = generate(&layout(8, 10), target, &mut rng).unwrap();
            let unique: HashSet<_> = scenario.objects().iter().collect();
            assert_eq!(unique.len(), 10);
            assert_eq!(scenario.positions().len(), 10);

            for (object, pos) in scenario.objects().iter().zip(scenario.positions()) {
                assert_eq!(world.object_at(*pos), Some(*object));
            }
            let agent = world.agent_position().unwrap();
            assert!(!scenario.positions().contains(&agent));
        }
    }

    #[test]
    fn target_aliases_the_first_object() {
        let mut rng = StdRng::seed_from_u64(1);
        let (_, scenario) =
            generate(&layout(7, 3), ResolvedTarget::Kind(ObjectKind::Key), &mut rng).unwrap();
        assert_eq!(scenario.target_position(), scenario.positions()[0]);
        assert_eq!(scenario.target_descriptor(), scenario.objects()[0]);
        assert_eq!(scenario.target_descriptor().kind, ObjectKind::Key);
        assert_eq!(scenario.distractors().count(), 2);
        assert!(
            scenario
                .distractors()
                .all(|(object, _)| object.kind != ObjectKind::Key)
        );
    }

    #[test]
    fn mission_names_the_target() {
        let mut rng = StdRng::seed_from_u64(17);
        let (_, scenario) = generate(
            &layout(7, 3),
            ResolvedTarget::Color(ObjectColor::Purple),
            &mut rng,
        )
        .unwrap();
        let target = scenario.target_descriptor();
        assert_eq!(
            scenario.mission(),
            format!("go to the {} {}", target.color.as_str(), target.kind.as_str())
        );
        assert!(scenario.mission().starts_with("go to the purple "));
    }

    #[test]
    fn serializes_target_first() {
        let mut rng = StdRng::seed_from_u64(4);
        let target = ResolvedTarget::Color(ObjectColor::Green);
        let (_, scenario) = generate(&layout(7, 3), target, &mut rng).unwrap();
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["objects"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["objects"][0]["color"], "green");
        assert_eq!(json["mission"], scenario.mission());
    }

    #[test]
    fn same_seed_same_scenario() {
        let target = ResolvedTarget::Kind(ObjectKind::Ball);
        let first = generate(&layout(7, 4), target, &mut StdRng::seed_from_u64(77)).unwrap();
        let second = generate(&layout(7, 4), target, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(first.1, second.1);
        assert_eq!(first.0.agent(), second.0.agent());
    }

    #[test]
    fn the_largest_satisfiable_count_still_generates() {
        let mut rng = StdRng::seed_from_u64(23);
        let by_kind = max_object_count(TargetSpec::RandomType);
        let by_color = max_object_count(TargetSpec::RandomColor);
        assert_eq!(by_kind, 13);
        assert_eq!(by_color, 16);
        assert_eq!(max_object_count(TargetSpec::Random), 13);

        let (_, scenario) =
            generate(&layout(8, by_kind), ResolvedTarget::Kind(ObjectKind::Box), &mut rng).unwrap();
        assert_eq!(scenario.objects().len(), by_kind);
        let (_, scenario) = generate(
            &layout(8, by_color),
            ResolvedTarget::Color(ObjectColor::Red),
            &mut rng,
        )
        .unwrap();
        assert_eq!(scenario.objects().len(), by_color);
    }

    #[test]
    fn too_many_objects_fails_instead_of_looping() {
        let mut rng = StdRng::seed_from_u64(5);
        let target = ResolvedTarget::Kind(ObjectKind::Key);
        let err = generate(&layout(10, 14), target, &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerationError::Unsatisfiable {
                requested: 14,
                placed: 13,
                draws: MAX_CANDIDATE_DRAWS,
                target,
            }
        );
    }

    #[test]
    fn a_full_grid_reports_no_free_cell() {
        let mut rng = StdRng::seed_from_u64(5);
        let err = generate(&layout(3, 2), ResolvedTarget::Kind(ObjectKind::Key), &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::World(WorldError::NoFreeCell { .. })
        ));
    }
}
