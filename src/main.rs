use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floorplan_anchor::io::SessionScript;
use floorplan_anchor::scene::{RoutePreference, SceneContext};
use floorplan_anchor::sim::{AnchorRegistry, RecordingOverlay, SimAnchorProvider};
use floorplan_anchor::system::{AnchorConfig, Collaborators, ReconcileSystem};
use floorplan_anchor::tracking::EventFeed;

/// Replay a scripted AR session through the floorplan anchoring core.
#[derive(Parser, Debug)]
#[command(name = "floorplan-replay", version)]
struct Args {
    /// Session script (YAML).
    #[arg(long)]
    script: PathBuf,

    /// Anchor configuration (YAML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated anchor creation latency in milliseconds.
    #[arg(long, default_value_t = 30)]
    latency_ms: u64,

    /// 1-based anchor request numbers that should fail.
    #[arg(long = "fail", num_args = 1..)]
    failures: Vec<u64>,

    /// Active route: normal, accessible or well-lit.
    #[arg(long, default_value = "normal")]
    route: RoutePreference,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnchorConfig::from_yaml_file(path)?,
        None => AnchorConfig::default(),
    };
    let script = SessionScript::from_yaml_file(&args.script)
        .with_context(|| format!("Loading session script {:?}", args.script))?;
    info!(steps = script.steps.len(), marker = %config.target_marker, "session script loaded");

    let registry = AnchorRegistry::new();
    let provider = SimAnchorProvider::new(registry.clone(), Duration::from_millis(args.latency_ms))
        .with_jitter(Duration::from_millis(args.latency_ms / 2), 42)
        .with_failures(args.failures.iter().copied());
    let overlay = RecordingOverlay::new();
    let probe = overlay.probe();

    let markers = EventFeed::new();
    let planes = EventFeed::new();
    let mut system = ReconcileSystem::new(
        config,
        Collaborators::new()
            .with_marker_feed(Arc::clone(&markers))
            .with_plane_feed(Arc::clone(&planes))
            .with_anchor_provider(provider)
            .with_overlay(overlay),
    );
    if let Some(err) = system.setup_error() {
        warn!(error = %err, "anchoring disabled, nothing to replay");
        return Ok(());
    }

    let settle = Duration::from_secs(5).max(Duration::from_millis(args.latency_ms * 4));
    if system.wait_until(settle, |st| st.subscribed).is_none() {
        warn!("router did not subscribe in time");
    }

    let summary = script.replay(&markers, &planes);
    info!(
        markers = summary.marker_batches,
        planes = summary.plane_batches,
        dropped = summary.dropped,
        "script replayed"
    );

    // Wait until the router drained both feeds and every anchor request resolved.
    let delivered = summary.delivered();
    let status = system
        .wait_until(settle, |st| {
            st.batches_handled >= delivered
                && st.pending_anchors == 0
                && st.anchors.adopted + st.anchors.failed + st.anchors.superseded
                    == st.anchors.reconciles
        })
        .unwrap_or_else(|| {
            warn!(delivered, "session did not settle in time, reporting partial state");
            system.status()
        });
    system.shutdown();

    println!("Overlay");
    match status.overlay_pose {
        Some(pose) => println!(
            "  position: [{:.3}, {:.3}, {:.3}]  yaw: {:.1} deg",
            pose.position.x,
            pose.position.y,
            pose.position.z,
            pose.forward().x.atan2(pose.forward().z).to_degrees()
        ),
        None => println!("  not placed (target marker never tracked)"),
    }
    match status.floor_height {
        Some(h) => println!("  floor height: {:.3}", h),
        None => println!("  floor height: unknown"),
    }
    println!("Anchors");
    println!(
        "  current: {}",
        status
            .current_anchor
            .map(|a| a.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "  requests: {}  adopted: {}  superseded: {}  failed: {}",
        status.anchors.reconciles,
        status.anchors.adopted,
        status.anchors.superseded,
        status.anchors.failed
    );
    println!("  live in provider: {}", registry.live_count());
    println!("  overlay commands: {}", probe.commands().len());

    let scene = SceneContext::new(args.route);
    println!("Routes");
    for route in RoutePreference::ALL {
        let style = scene.path_style(route);
        println!("  {:<8} {:?} at {:.1}", route.tag(), style.color, style.height);
    }

    Ok(())
}
