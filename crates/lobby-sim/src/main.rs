//! lobby-sim: drives a handful of lobby sessions over the loopback platform.
//!
//! Every peer runs its own `LobbySession` on this thread. The first peer owns
//! the lobby, publishes some metadata and "speaks" a synthetic tone in bursts
//! so that the others can be watched picking up and dropping its talk state.

mod observer;
mod tone;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lobby_config::{LobbyConfig, LogLevel};
use lobby_core::{
    LobbyId, LobbySession, LoopbackLobby, LoopbackPlatform, RecordingOutput, SessionSettings,
    UserId,
};
use tracing_subscriber::EnvFilter;

use crate::observer::LogObserver;
use crate::tone::ToneGenerator;

type Session = LobbySession<LoopbackPlatform, RecordingOutput>;

const SAMPLE_RATE: u32 = 16_000;
const DEFAULT_FILTER: &str = "lobby_sim=info,lobby_core=info";

/// Ticks per speech burst; the owner talks for the first half of each.
const BURST_TICKS: u64 = 60;

#[derive(Parser)]
#[command(name = "lobby-sim", about = "Simulate peers in a loopback lobby")]
struct Args {
    /// Number of peers to join.
    #[arg(short, long, default_value_t = 2)]
    peers: u64,

    /// Ticks to run before shutting down.
    #[arg(short, long, default_value_t = 300)]
    ticks: u64,

    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Config file; defaults to the platform config location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `lobby_core=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Start every session in light mode.
    #[arg(long)]
    light_mode: bool,
}

fn load_config(args: &Args) -> (LobbyConfig, Option<String>) {
    let result = match &args.config {
        Some(path) => lobby_config::load_from_path(path),
        None => lobby_config::load_config(),
    };
    match result {
        Ok(config) => (config, None),
        Err(e) => (LobbyConfig::default(), Some(e.to_string())),
    }
}

fn init_logging(args: &Args, level: LogLevel) {
    let filter = match &args.log_level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
            LogLevel::Info => DEFAULT_FILTER.into(),
            other => {
                let lvl = other.as_directive();
                format!("lobby_sim={lvl},lobby_core={lvl},lobby_config={lvl}").into()
            }
        }),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (config, config_error) = load_config(&args);
    init_logging(&args, config.logging.level);

    if let Some(e) = config_error {
        tracing::warn!("config not loaded, using defaults: {e}");
    }

    let mut settings = SessionSettings::from(&config);
    settings.light_mode |= args.light_mode;

    let peers = args.peers.max(1);
    let lobby = LoopbackLobby::create(LobbyId::new(1), "lobby-sim");
    let mut sessions: Vec<Session> = (1..=peers)
        .map(|n| {
            let platform = lobby.join(UserId::new(n), &format!("peer-{n}"));
            LobbySession::new(platform, RecordingOutput::default(), settings.clone())
                .with_observer(LogObserver::new(UserId::new(n)))
        })
        .collect();

    for session in &mut sessions {
        session.initialize();
    }
    pump_all(&mut sessions);

    let host = &mut sessions[0];
    host.set_voice_chat_enabled(true);
    for result in [
        host.set_lobby_data("mode", "simulation"),
        host.set_lobby_member_limit(peers as u32),
        host.send_lobby_chat_msg(b"hello from the host"),
    ] {
        if let Err(e) = result {
            tracing::warn!("host setup call failed: {e}");
        }
    }
    for session in sessions.iter_mut().skip(1) {
        if let Err(e) = session.set_member_data("ready", "1") {
            tracing::warn!("member data write failed: {e}");
        }
    }
    pump_all(&mut sessions);

    tracing::info!(
        peers,
        ticks = args.ticks,
        tick_ms = args.tick_ms,
        light_mode = settings.light_mode,
        "lobby-sim running"
    );

    let dt = Duration::from_millis(args.tick_ms.max(1));
    let samples_per_tick = (SAMPLE_RATE as u64 * dt.as_millis() as u64 / 1000) as usize;
    let mut tone = ToneGenerator::new(440.0, SAMPLE_RATE);
    let mut interval = tokio::time::interval(dt);

    for tick in 0..args.ticks {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }

        if tick % BURST_TICKS < BURST_TICKS / 2 {
            let frame = tone.next_frame(samples_per_tick);
            sessions[0].platform_mut().feed_microphone(frame);
        }

        for session in &mut sessions {
            session.tick(dt.as_secs_f32());
        }
        pump_all(&mut sessions);

        if tick % (BURST_TICKS / 4) == 0 {
            report(tick, &sessions);
        }
    }

    for i in 0..sessions.len() {
        sessions[i].shutdown();
        pump_all(&mut sessions);
    }

    let sent = sessions[0].platform().stats().voice_sends;
    let created: usize = sessions.iter().map(|s| s.output().created()).sum();
    tracing::info!(voice_frames_sent = sent, outputs_created = created, "lobby-sim done");
}

fn pump_all(sessions: &mut [Session]) {
    for session in sessions.iter_mut() {
        session.pump_events();
    }
}

fn report(tick: u64, sessions: &[Session]) {
    for session in sessions.iter().skip(1) {
        let talking: Vec<String> = session
            .members()
            .iter()
            .filter(|m| session.is_member_talking(m.index))
            .map(|m| m.name.clone())
            .collect();
        tracing::info!(
            tick,
            peer = ?session.local_user_id(),
            mode = session.lobby_data("mode"),
            limit = session.lobby_member_limit(),
            talking = ?talking,
            "peer status"
        );
    }
}
