use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use goto_best_core::{
    ObjectColor, ObjectKind,
    agent::{Agent, PlanningAgent, RandomAgent},
    environment::{EnvConfig, GoToBestEnv, StepResult},
    judge::Outcome,
    registry,
    world::{CellType, World},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Watch an agent go to the named object", long_about = None)]
struct Args {
    /// Registered environment id, e.g. MiniGrid-GoToBest-7x7-N3-Key-v0
    #[arg(long, conflicts_with_all = ["config", "size", "objects", "target"])]
    env: Option<String>,

    /// JSON file with `grid_size`, `object_count` and `target`
    #[arg(long, value_name = "CONFIG_FILE", conflicts_with_all = ["size", "objects", "target"])]
    config: Option<PathBuf>,

    /// Side length of the grid, walls included
    #[arg(long, default_value_t = 7)]
    size: usize,

    /// Number of objects to place
    #[arg(long, default_value_t = 3)]
    objects: usize,

    /// random, random_color, random_type, a color name, key, ball or box
    #[arg(long, default_value = "random")]
    target: String,

    /// Seed for both the environment and the random agent
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Which scripted agent plays
    #[arg(long, value_enum, default_value_t = AgentChoice::Planner)]
    agent: AgentChoice,

    /// Run without the terminal UI and log a summary
    #[arg(long)]
    headless: bool,

    /// Episodes to play in headless mode
    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Write logs here in interactive mode
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AgentChoice {
    Random,
    Planner,
}

impl AgentChoice {
    fn build(self, seed: u64) -> Box<dyn Agent> {
        match self {
            AgentChoice::Random => Box::new(RandomAgent::new(seed)),
            AgentChoice::Planner => Box::new(PlanningAgent::new()),
        }
    }
}

/// Running totals across episodes.
#[derive(Debug, Default)]
struct Tally {
    episodes: usize,
    reached: usize,
    total_reward: f64,
}

impl Tally {
    fn record(&mut self, result: &StepResult) {
        self.episodes += 1;
        self.total_reward += result.reward;
        if result.info.outcome == Some(Outcome::ReachedTarget) {
            self.reached += 1;
        }
    }

    fn mean_reward(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_reward / self.episodes as f64
        }
    }
}

struct App {
    /// The environment being played.
    environment: GoToBestEnv,
    /// Picks an action every tick.
    agent: Box<dyn Agent>,
    agent_choice: AgentChoice,
    seed: u64,
    /// The most recent step, if any.
    last_step: Option<StepResult>,
    tally: Tally,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(environment: GoToBestEnv, agent_choice: AgentChoice, seed: u64) -> Result<Self> {
        let mut app = App {
            environment,
            agent: agent_choice.build(seed),
            agent_choice,
            seed,
            last_step: None,
            tally: Tally::default(),
            should_quit: false,
        };
        app.reset()?;
        Ok(app)
    }

    /// Starts a new episode with a fresh agent.
    fn reset(&mut self) -> Result<()> {
        self.environment.reset()?;
        self.seed = self.seed.wrapping_add(1);
        self.agent = self.agent_choice.build(self.seed);
        self.last_step = None;
        Ok(())
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.environment.is_done() {
            return Ok(());
        }
        let Some(view) = self.environment.view() else {
            return Ok(());
        };
        let action = self.agent.act(&view);
        let result = self.environment.step(action)?;
        if result.done {
            tracing::info!(
                outcome = ?result.info.outcome,
                reward = result.reward,
                steps = result.info.step_count,
                "episode finished"
            );
            self.tally.record(&result);
        }
        self.last_step = Some(result);
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;

    let config = load_config(&args)?;
    let environment = GoToBestEnv::new(config, args.seed)?;
    tracing::info!(
        grid_size = config.grid_size,
        objects = config.object_count,
        target = %config.target,
        seed = args.seed,
        "environment ready"
    );

    if args.headless {
        return run_headless(environment, args.agent, args.seed, args.episodes);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(environment, args.agent, args.seed)?;

    // Run the main application loop
    let outcome = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    outcome
}

/// Logs to stderr in headless mode, to `--log-file` in interactive mode, or nowhere.
fn init_logging(args: &Args) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.headless {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    } else if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<EnvConfig> {
    if let Some(id) = &args.env {
        return Ok(registry::lookup(id).with_context(|| {
            format!(
                "Known environments: {}",
                registry::ids().collect::<Vec<_>>().join(", ")
            )
        })?);
    }
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: EnvConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        return Ok(config);
    }
    Ok(EnvConfig::new(args.size, args.objects, &args.target)?)
}

/// Plays `episodes` episodes back to back and logs the results.
fn run_headless(
    mut environment: GoToBestEnv,
    agent_choice: AgentChoice,
    seed: u64,
    episodes: usize,
) -> Result<()> {
    let mut tally = Tally::default();
    for episode in 0..episodes {
        environment.reset()?;
        let mut agent = agent_choice.build(seed.wrapping_add(episode as u64));
        let result = loop {
            let view = environment
                .view()
                .context("Environment has no episode after reset")?;
            let action = agent.act(&view);
            let result = environment.step(action)?;
            if result.done {
                break result;
            }
        };
        tracing::info!(
            episode,
            mission = %result.observation.mission,
            outcome = ?result.info.outcome,
            reward = result.reward,
            steps = result.info.step_count,
            "episode finished"
        );
        tally.record(&result);
    }
    tracing::info!(
        episodes = tally.episodes,
        reached = tally.reached,
        mean_reward = tally.mean_reward(),
        "run complete"
    );
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250); // Update rate
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('r') => app.reset()?,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the map
            Constraint::Percentage(20), // Area for the episode status
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    if let Some(world) = app.environment.world() {
        render_map(frame, main_layout[0], world);
    }
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'r' for a new episode, 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn object_color(color: ObjectColor) -> Color {
    match color {
        ObjectColor::Red => Color::Red,
        ObjectColor::Green => Color::Green,
        ObjectColor::Blue => Color::Blue,
        ObjectColor::Purple => Color::Magenta,
        ObjectColor::Yellow => Color::Yellow,
        ObjectColor::Grey => Color::Gray,
    }
}

fn object_glyph(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Key => "k",
        ObjectKind::Ball => "o",
        ObjectKind::Box => "b",
    }
}

fn agent_glyph(direction: goto_best_core::Direction) -> &'static str {
    match direction {
        goto_best_core::Direction::Right => ">",
        goto_best_core::Direction::Down => "v",
        goto_best_core::Direction::Left => "<",
        goto_best_core::Direction::Up => "^",
    }
}

/// Renders the mission, step counter and results.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.environment;
    let mission = env.mission().unwrap_or("-");
    let last = match &app.last_step {
        Some(step) if step.done => {
            let outcome = match step.info.outcome {
                Some(Outcome::ReachedTarget) => "reached the target",
                Some(Outcome::ReachedDistractor) => "stopped at the wrong object",
                Some(Outcome::Missed) => "stopped away from every object",
                Some(Outcome::Toggled) => "toggled",
                None => "ran out of steps",
            };
            format!("Finished: {outcome}, reward {:.3}", step.reward)
        }
        Some(_) => "Running".to_string(),
        None => "Starting".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::raw("Mission: "),
            Span::styled(mission.to_string(), Style::default().bold()),
        ]),
        Line::from(format!(
            "Step {}/{}  {last}",
            env.step_count(),
            env.max_steps()
        )),
        Line::from(format!(
            "Episodes: {}  Reached: {}  Mean reward: {:.3}",
            app.tally.episodes,
            app.tally.reached,
            app.tally.mean_reward()
        )),
    ];

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Episode"));
    frame.render_widget(status, area);
}

/// Renders the world grid onto the frame.
fn render_map(frame: &mut Frame, area: Rect, world: &World) {
    let agent = world.agent();
    let mut lines: Vec<Line> = Vec::with_capacity(world.height());

    for y in 0..world.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(world.width());
        for x in 0..world.width() {
            let pos = goto_best_core::Position::new(x, y);
            if let Some(agent) = agent.filter(|agent| agent.position == pos) {
                spans.push(Span::styled(
                    agent_glyph(agent.direction),
                    Style::default().fg(Color::Red).bold(),
                ));
            } else if let Some(object) = world.object_at(pos) {
                spans.push(Span::styled(
                    object_glyph(object.kind),
                    Style::default().fg(object_color(object.color)),
                ));
            } else {
                match world.terrain().get(pos) {
                    Some(CellType::Wall) => {
                        spans.push(Span::styled("#", Style::default().fg(Color::DarkGray)))
                    }
                    _ => spans.push(Span::raw(" ")),
                }
            }
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Go To Best Object").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
