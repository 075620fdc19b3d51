use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    judge::{Outcome, judge},
    scenario::{GenerationError, Layout, Scenario, generate, max_object_count},
    target::{InvalidTarget, TargetSpec},
    world::{Action, World, WorldError},
};

/// Problems with how an environment was configured. Raised at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),
    #[error("Grid size {size} is too small, the walls alone take a 3x3 grid")]
    GridTooSmall { size: usize },
    #[error("Grid size {size} is too large, at most {max} is supported")]
    GridTooLarge { size: usize, max: usize },
    #[error("At least one object is required")]
    NoObjects,
    #[error("Target '{target}' supports at most {max} distinct objects, {requested} requested")]
    TooManyObjects {
        requested: usize,
        max: usize,
        target: TargetSpec,
    },
    #[error("{requested} objects and the agent do not fit in {cells} free cells")]
    NotEnoughRoom { requested: usize, cells: usize },
    #[error("Unknown environment '{id}'")]
    UnknownEnvironment { id: String },
}

/// Problems while running an episode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("The environment must be reset before stepping")]
    NotReset,
    #[error("The episode is over, reset to start a new one")]
    EpisodeOver,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Largest accepted side length.
pub const MAX_GRID_SIZE: usize = 1024;

/// Parameters of a go-to-best-object environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Side length of the square grid, walls included.
    pub grid_size: usize,
    pub object_count: usize,
    pub target: TargetSpec,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            grid_size: 7,
            object_count: 2,
            target: TargetSpec::Random,
        }
    }
}

impl EnvConfig {
    /// Builds and validates a configuration from a target string such as `"key"` or `"random_color"`.
    pub fn new(grid_size: usize, object_count: usize, target: &str) -> Result<Self, ConfigError> {
        let config = EnvConfig {
            grid_size,
            object_count,
            target: target.parse()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 3 {
            return Err(ConfigError::GridTooSmall {
                size: self.grid_size,
            });
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::GridTooLarge {
                size: self.grid_size,
                max: MAX_GRID_SIZE,
            });
        }
        if self.object_count == 0 {
            return Err(ConfigError::NoObjects);
        }
        let max = max_object_count(self.target);
        if self.object_count > max {
            return Err(ConfigError::TooManyObjects {
                requested: self.object_count,
                max,
                target: self.target,
            });
        }
        let cells = (self.grid_size - 2) * (self.grid_size - 2);
        if self.object_count >= cells {
            return Err(ConfigError::NotEnoughRoom {
                requested: self.object_count,
                cells,
            });
        }
        Ok(())
    }

    /// Step budget per episode, `5 * size^2`. Saturates on sizes that failed validation.
    pub fn max_steps(&self) -> usize {
        self.grid_size
            .saturating_mul(self.grid_size)
            .saturating_mul(5)
    }

    pub fn layout(&self) -> Layout {
        Layout {
            width: self.grid_size,
            height: self.grid_size,
            max_steps: self.max_steps(),
            object_count: self.object_count,
        }
    }
}

/// What the agent gets back after reset and every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub agent: Position,
    pub direction: Direction,
    pub mission: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub step_count: usize,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Read-only view of the running episode handed to agents.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeView<'a> {
    pub world: &'a World,
    pub mission: &'a str,
}

#[derive(Debug)]
struct Episode {
    world: World,
    scenario: Scenario,
    done: bool,
}

impl Episode {
    fn observation(&self) -> Result<Observation, EnvError> {
        let agent = self.world.agent().ok_or(WorldError::AgentNotPlaced)?;
        Ok(Observation {
            agent: agent.position,
            direction: agent.direction,
            mission: self.scenario.mission().to_string(),
        })
    }
}

/// The go-to-best-object task: reach the object named by the mission and declare done.
#[derive(Debug)]
pub struct GoToBestEnv {
    config: EnvConfig,
    rng: StdRng,
    episode: Option<Episode>,
}

impl GoToBestEnv {
    /// Validates `config` and seeds the environment's own random source.
    pub fn new(config: EnvConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: EnvConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(GoToBestEnv {
            config,
            rng,
            episode: None,
        })
    }

    /// Generates a fresh scenario and starts a new episode.
    pub fn reset(&mut self) -> Result<Observation, EnvError> {
        let target = self.config.target.resolve(&mut self.rng);
        let (world, scenario) = generate(&self.config.layout(), target, &mut self.rng)?;
        tracing::debug!(
            mission = %scenario.mission(),
            target = ?target,
            objects = scenario.objects().len(),
            "episode reset"
        );

        let episode = Episode {
            world,
            scenario,
            done: false,
        };
        let observation = episode.observation()?;
        self.episode = Some(episode);
        Ok(observation)
    }

    /// Advances the episode by one action.
    pub fn step(&mut self, action: Action) -> Result<StepResult, EnvError> {
        let episode = self.episode.as_mut().ok_or(EnvError::NotReset)?;
        if episode.done {
            return Err(EnvError::EpisodeOver);
        }

        // Finishing on this step is rewarded as if the step had not been taken yet.
        let full_reward = episode.world.base_reward();
        let base = episode.world.step(action)?;
        let agent = episode
            .world
            .agent_position()
            .ok_or(WorldError::AgentNotPlaced)?;
        let verdict = judge(action, agent, &episode.scenario, full_reward, base);
        episode.done = verdict.done;

        if verdict.done {
            tracing::debug!(
                ?action,
                outcome = ?verdict.outcome,
                reward = verdict.reward,
                steps = episode.world.step_count(),
                "episode finished"
            );
        }

        Ok(StepResult {
            observation: episode.observation()?,
            reward: verdict.reward,
            done: verdict.done,
            info: StepInfo {
                step_count: episode.world.step_count(),
                outcome: verdict.outcome,
            },
        })
    }

    /// The mission of the current episode, once reset.
    pub fn mission(&self) -> Option<&str> {
        self.episode
            .as_ref()
            .map(|episode| episode.scenario.mission())
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.episode.as_ref().map(|episode| &episode.scenario)
    }

    pub fn world(&self) -> Option<&World> {
        self.episode.as_ref().map(|episode| &episode.world)
    }

    pub fn view(&self) -> Option<EpisodeView<'_>> {
        self.episode.as_ref().map(|episode| EpisodeView {
            world: &episode.world,
            mission: episode.scenario.mission(),
        })
    }

    /// True once the current episode has terminated.
    pub fn is_done(&self) -> bool {
        self.episode.as_ref().is_some_and(|episode| episode.done)
    }

    pub fn step_count(&self) -> usize {
        self.world().map_or(0, World::step_count)
    }

    pub fn max_steps(&self) -> usize {
        self.config.max_steps()
    }
}
