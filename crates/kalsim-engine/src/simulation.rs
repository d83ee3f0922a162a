use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use kalsim_agents::{generate_default_personas, Agent, LlmClient, MarketDataProvider, PersonaProvider};
use kalsim_layers::Platform;
use kalsim_models::{
    ActionResult, NeighborSignal, Persona, SimulationConfig, SimulationLog, SimulationMetadata,
    SocialMediaInfo, ViralPostSignal,
};
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::market::MarketModel;
use crate::sentiment::{keyword_score, CommunitySentiment};
use crate::social::SocialFeed;
use crate::storage::LogWriter;

const MIN_ACTIVE_AGENTS: usize = 5;
const MAX_NEIGHBORS: usize = 10;
const UPVOTES_PER_AGENT: usize = 3;
const TRENDING_EVENT_LIMIT: usize = 10;
const RECENT_ACTIONS_IN_STATUS: usize = 10;
const RAPID_SPREAD_VELOCITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    #[default]
    Uninitialized,
    Setup,
    Running,
    /// Ended early on request.
    Stopped,
    Complete,
    Failed,
}

impl SimulationPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Stopped | Self::Complete | Self::Failed)
    }
}

/// Progress view polled while a run is in flight.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStatus {
    pub phase: SimulationPhase,
    pub current_step: usize,
    pub total_steps: usize,
    pub progress_pct: f64,
    pub current_price: f64,
    pub current_day: usize,
    pub error: Option<String>,
    pub recent_actions: Vec<ActionResult>,
}

/// How many agents act in a step: a third of the population, at least five.
pub fn active_agent_count(population: usize) -> usize {
    population.min(MIN_ACTIVE_AGENTS.max(population / 3))
}

/// Neighbour action label: tweets are read as buy or sell calls by their tone.
fn stance(action: &ActionResult) -> String {
    if action.is_tweet() {
        let score = keyword_score(&action.content);
        if score > 0.0 {
            return "BUY".to_string();
        }
        if score < 0.0 {
            return "SELL".to_string();
        }
    }
    action.action_type.as_str().to_string()
}

/// The GME/WSB social simulation.
pub struct Simulation {
    config: SimulationConfig,
    llm: Arc<dyn LlmClient>,
    market_data: Option<Arc<dyn MarketDataProvider>>,
    personas: Option<Arc<dyn PersonaProvider>>,
    writer: Option<LogWriter>,
    rng: StdRng,
    agents: Vec<Agent>,
    market: MarketModel,
    sentiment: CommunitySentiment,
    feed: SocialFeed,
    platform: Platform,
    post_order: Vec<String>,
    actions: Vec<ActionResult>,
    current_time: DateTime<Utc>,
    adoption_rate: f64,
    trend_velocity: f64,
    phase: SimulationPhase,
    cancel: CancellationToken,
    status: Arc<Mutex<SimulationStatus>>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, llm: Arc<dyn LlmClient>) -> Result<Self, EngineError> {
        if config.agent_count == 0 {
            return Err(EngineError::Config("agent_count must be at least 1".to_string()));
        }
        if config.time_step_hours == 0 || config.time_step_hours > 24 {
            return Err(EngineError::Config(format!(
                "time_step_hours must be within 1..=24, got {}",
                config.time_step_hours
            )));
        }
        let market = MarketModel::new(
            config.base_price,
            config.initial_short_interest,
            config.time_step_hours,
        )?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let status = SimulationStatus {
            total_steps: config.total_steps(),
            current_price: config.base_price,
            ..Default::default()
        };

        info!(
            days = config.days,
            agents = config.agent_count,
            seed = ?config.seed,
            "Simulation initialized"
        );

        Ok(Self {
            writer: Some(LogWriter::new(&config.output_path)),
            platform: Platform::new(config.viral_threshold),
            current_time: config.start_time,
            config,
            llm,
            market_data: None,
            personas: None,
            rng,
            agents: Vec::new(),
            market,
            sentiment: CommunitySentiment::default(),
            feed: SocialFeed::new(Vec::new()),
            post_order: Vec::new(),
            actions: Vec::new(),
            adoption_rate: 0.0,
            trend_velocity: 0.0,
            phase: SimulationPhase::Uninitialized,
            cancel: CancellationToken::new(),
            status: Arc::new(Mutex::new(status)),
        })
    }

    pub fn with_market_data(mut self, provider: Arc<dyn MarketDataProvider>) -> Self {
        self.market_data = Some(provider);
        self
    }

    pub fn with_personas(mut self, provider: Arc<dyn PersonaProvider>) -> Self {
        self.personas = Some(provider);
        self
    }

    /// Keep the log in memory only.
    pub fn without_persistence(mut self) -> Self {
        self.writer = None;
        self
    }

    /// Token that stops the run at the next step boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn status_handle(&self) -> Arc<Mutex<SimulationStatus>> {
        Arc::clone(&self.status)
    }

    pub fn status(&self) -> SimulationStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn actions(&self) -> &[ActionResult] {
        &self.actions
    }

    pub fn community_sentiment(&self) -> f64 {
        self.sentiment.value()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Load trends and personas, create agents and seed content.
    pub async fn setup(&mut self) -> Result<(), EngineError> {
        self.set_phase(SimulationPhase::Setup);
        info!("Setting up simulation");

        if !self.llm.health_check().await {
            warn!("LLM health check failed, decisions may fall back to HOLD");
        }

        let topics = self.load_trending_topics().await;
        self.feed = SocialFeed::new(topics);

        let personas = self.load_personas().await;
        self.agents = (0..self.config.agent_count)
            .map(|i| {
                let persona = personas[i % personas.len()].clone();
                Agent::new(i, persona, self.config.market_topic.clone())
            })
            .collect();

        info!(
            agents = self.agents.len(),
            seed_posts = self.feed.seed_posts().len(),
            "Setup complete"
        );
        Ok(())
    }

    async fn load_trending_topics(&mut self) -> Vec<String> {
        let Some(provider) = &self.market_data else {
            return Vec::new();
        };
        match provider.get_trending_events(TRENDING_EVENT_LIMIT).await {
            Ok(events) if !events.is_empty() => {
                let analysis = provider.analyze_trends(&events);
                info!(topics = analysis.topics.len(), summary = %analysis.summary, "Loaded market trends");
                analysis.topics
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load market trends");
                Vec::new()
            }
        }
    }

    async fn load_personas(&mut self) -> Vec<Persona> {
        if let Some(provider) = &self.personas {
            match provider.fetch_user_pool(self.config.agent_count).await {
                Ok(pool) if !pool.is_empty() => {
                    info!(count = pool.len(), "Loaded persona pool");
                    return pool;
                }
                Ok(_) => warn!("Persona provider returned no personas, generating defaults"),
                Err(e) => warn!(error = %e, "Failed to load personas, generating defaults"),
            }
        }
        generate_default_personas(self.config.agent_count, &mut self.rng)
    }

    /// Run every step, then persist the log. Stops early when the cancel token fires.
    pub async fn run(&mut self) -> Result<SimulationLog, EngineError> {
        if self.agents.is_empty() {
            self.setup().await?;
        }

        let total_steps = self.config.total_steps();
        self.set_phase(SimulationPhase::Running);
        info!(total_steps, "Starting simulation");

        for step in 0..total_steps {
            if self.cancel.is_cancelled() {
                info!(step, "Simulation stopping early on request");
                self.set_phase(SimulationPhase::Stopped);
                break;
            }
            if let Err(e) = self.execute_step(step).await {
                error!(step, error = %e, "Simulation step failed");
                self.fail(&e);
                return Err(e);
            }
        }

        if self.phase == SimulationPhase::Running {
            self.set_phase(SimulationPhase::Complete);
        }

        let log = self.log();
        let saved = match &self.writer {
            Some(writer) => writer.save(&log),
            None => Ok(()),
        };
        if let Err(e) = saved {
            error!(error = %e, "Failed to save simulation log");
            self.fail(&e);
            return Err(e);
        }

        info!(
            actions = log.actions.len(),
            final_price = self.market.current_price(),
            phase = ?self.phase,
            "Simulation finished"
        );
        Ok(log)
    }

    /// Snapshot of everything recorded so far.
    pub fn log(&self) -> SimulationLog {
        SimulationLog {
            metadata: SimulationMetadata {
                simulation_days: self.config.days,
                agent_count: self.config.agent_count,
                total_steps: self.config.total_steps(),
                start_time: self.config.start_time,
                end_time: self.current_time,
                total_actions: self.actions.len(),
            },
            price_history: self.market.price_history().to_vec(),
            actions: self.actions.clone(),
        }
    }

    async fn execute_step(&mut self, step: usize) -> Result<(), EngineError> {
        self.current_time =
            self.config.start_time + Duration::hours(step as i64 * i64::from(self.config.time_step_hours));

        self.market
            .advance(step, self.sentiment.value(), &mut self.rng);
        let market_info = self.market.snapshot(self.current_time, &mut self.rng);
        let base_social = self.social_snapshot();

        let sample = active_agent_count(self.agents.len());
        let active = index::sample(&mut self.rng, self.agents.len(), sample).into_vec();

        let mut step_actions: Vec<ActionResult> = Vec::with_capacity(active.len());
        let mut neighbors: Vec<NeighborSignal> = Vec::new();
        let temperature = self.config.decision_temperature;

        for idx in active {
            let mut social = base_social.clone();
            social.neighbors = neighbors[neighbors.len().saturating_sub(MAX_NEIGHBORS)..].to_vec();

            let agent = &mut self.agents[idx];
            agent.observe(self.current_time, Some(&market_info), Some(&social))?;

            let targets: Vec<String> = self
                .post_order
                .iter()
                .rev()
                .filter(|id| self.platform.get(id).is_some_and(|p| p.author_id != idx))
                .take(UPVOTES_PER_AGENT)
                .cloned()
                .collect();
            for post_id in &targets {
                self.platform.upvote(post_id, idx);
            }

            let decision = agent.decide(self.llm.as_ref(), temperature).await;
            let action = agent.act(&decision);

            if action.is_tweet() {
                let post = self.platform.create_post(
                    idx,
                    &action.content,
                    keyword_score(&action.content),
                    self.current_time,
                );
                self.post_order.push(post.id.clone());
            }

            let emotion = agent.state().emotional;
            neighbors.push(NeighborSignal {
                id: Some(idx),
                valence: emotion.valence,
                arousal: emotion.arousal,
                action: Some(stance(&action)),
                connection_strength: 0.5,
            });
            step_actions.push(action);
        }

        self.sentiment.update(&step_actions);

        let tweets = step_actions.iter().filter(|a| a.is_tweet()).count();
        let adoption = tweets as f64 / step_actions.len().max(1) as f64;
        self.trend_velocity = (adoption - self.adoption_rate).max(0.0);
        self.adoption_rate = adoption;

        debug!(
            step,
            price = market_info.stock_price,
            trend = %market_info.trend,
            sentiment = self.sentiment.value(),
            tweets,
            "Step complete"
        );

        self.actions.extend(step_actions);
        self.update_status(step + 1);
        Ok(())
    }

    fn social_snapshot(&mut self) -> SocialMediaInfo {
        let mut social = self.feed.snapshot(
            self.current_time,
            self.sentiment.value(),
            &self.actions,
            &mut self.rng,
        );
        social.adoption_rate = self.adoption_rate;
        social.trend_velocity = self.trend_velocity;
        social.rapid_spread = self.trend_velocity > RAPID_SPREAD_VELOCITY;
        social.viral_posts = self
            .post_order
            .iter()
            .filter_map(|id| self.platform.get(id))
            .filter(|p| self.platform.is_viral(p))
            .map(|p| ViralPostSignal {
                post_id: p.id.clone(),
                upvotes: p.upvotes,
                sentiment: p.sentiment,
            })
            .collect();
        social
    }

    fn set_phase(&mut self, phase: SimulationPhase) {
        self.phase = phase;
        if let Ok(mut status) = self.status.lock() {
            status.phase = phase;
        }
    }

    fn fail(&mut self, e: &EngineError) {
        self.phase = SimulationPhase::Failed;
        if let Ok(mut status) = self.status.lock() {
            status.phase = SimulationPhase::Failed;
            status.error = Some(e.to_string());
        }
    }

    fn update_status(&mut self, completed_steps: usize) {
        let total = self.config.total_steps();
        let recent = self.actions[self.actions.len().saturating_sub(RECENT_ACTIONS_IN_STATUS)..].to_vec();
        if let Ok(mut status) = self.status.lock() {
            status.current_step = completed_steps;
            status.total_steps = total;
            status.progress_pct = completed_steps as f64 / total.max(1) as f64 * 100.0;
            status.current_price = self.market.current_price();
            status.current_day = self.market.day_of(completed_steps.saturating_sub(1)) + 1;
            status.recent_actions = recent;
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("phase", &self.phase)
            .field("agents", &self.agents.len())
            .field("actions", &self.actions.len())
            .field("price", &self.market.current_price())
            .finish()
    }
}
