use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use bloodlines::config::Config;
use bloodlines::layout;
use bloodlines::logging::{log, log_startup, obj, v_str, Domain, Level};
use bloodlines::render;
use bloodlines::session::{Phase, SelectionState, SessionController};
use bloodlines::source::source_for;
use bloodlines::SeededEntropy;

fn draw(state: &SelectionState, entropy: &mut SeededEntropy) {
    let glyphs = state
        .selected_conflict()
        .map(|c| layout::timeline(c, entropy))
        .unwrap_or_default();
    print!("{}", render::screen(state, &glyphs));
    if state.phase == Phase::Ready {
        println!("\nselect 1-{} or q to quit", state.sample_set.len());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log_startup(&cfg.data_location, cfg.sample_size, cfg.rng_seed.is_some());

    let source = source_for(&cfg.data_location);
    let controller = SessionController::new(cfg.timing);
    let mut updates = controller.subscribe();

    // Layout jitter gets its own stream so it never perturbs ingestion draws.
    let mut jitter = SeededEntropy::new(cfg.rng_seed.map(|s| s.wrapping_add(1)));
    draw(&updates.borrow_and_update().clone(), &mut jitter);

    controller.start(source, cfg.sample_size, Box::new(SeededEntropy::new(cfg.rng_seed)))?;

    // Redraw once the entrance animation is armed, or right away when there
    // is nothing to animate.
    loop {
        updates.changed().await?;
        let state = updates.borrow_and_update().clone();
        if state.phase == Phase::NoData {
            draw(&state, &mut jitter);
            return Ok(());
        }
        if state.animation_armed {
            draw(&state, &mut jitter);
            break;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let index = match input.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                println!("expected a number or q");
                continue;
            }
        };
        if let Err(err) = controller.select(index).await {
            println!("{}", err);
            continue;
        }
        loop {
            updates.changed().await?;
            let state = updates.borrow_and_update().clone();
            if state.animation_armed {
                draw(&state, &mut jitter);
                break;
            }
        }
    }

    log(
        Level::Info,
        Domain::System,
        "shutdown",
        obj(&[("msg", v_str("session closed"))]),
    );
    Ok(())
}
