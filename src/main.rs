use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skycast_core::Config;
use skycast_weather::{
    CoordinatorOptions, FileLocationStore, SearchCoordinator, SearchState, WeatherApiGateway,
    WeatherSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;

const HELP: &str = "Type a city name to search. Commands: :select <n>, :reset, :quit";

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;

    let gateway = WeatherApiGateway::new(
        config.weather_api.api_key.clone(),
        config.weather_api.base_url.clone(),
        Duration::from_secs(config.weather_api.timeout_secs),
    )
    .context("Failed to create weather gateway")?;
    let store = FileLocationStore::new(config.config_dir.clone(), &config.storage.selection_key);

    let coordinator = SearchCoordinator::new(
        Arc::new(gateway),
        Arc::new(store),
        CoordinatorOptions {
            debounce: Duration::from_millis(config.search.debounce_ms),
        },
        Handle::current(),
    );

    // Restore runs in the background; the prompt is usable immediately
    let _restore = coordinator.restore_saved_location();

    let mut changes = coordinator.subscribe();
    tokio::spawn(async move {
        let mut last_rendered = SearchState::default();
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            if needs_render(&last_rendered, &state) {
                render(&state);
            }
            last_rendered = state;
        }
    });

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = line.trim();
        match input {
            ":quit" | ":q" => break,
            ":reset" => coordinator.reset_search(),
            ":help" => println!("{}", HELP),
            _ if input.starts_with(":select") => {
                let index = input
                    .trim_start_matches(":select")
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1));
                let state = coordinator.snapshot();
                match index.and_then(|i| state.search_results.get(i)) {
                    Some(candidate) => {
                        if !coordinator.select_location(candidate) {
                            println!("Weather for {} is still loading", candidate.name);
                        }
                    }
                    None => println!("No such result"),
                }
            }
            _ => coordinator.set_query(line.as_str()),
        }
    }

    coordinator.shutdown();
    tracing::info!("Skycast shutting down");
    Ok(())
}

/// Typing alone only changes `query`; skip redrawing for that.
fn needs_render(previous: &SearchState, current: &SearchState) -> bool {
    previous.loading != current.loading
        || previous.search_results != current.search_results
        || previous.selected_weather != current.selected_weather
        || previous.cached_weather.len() != current.cached_weather.len()
}

fn render(state: &SearchState) {
    if let Some(weather) = &state.selected_weather {
        print_selected(weather);
        return;
    }

    if state.loading {
        println!("Searching for {:?}...", state.query.trim());
        return;
    }

    if state.search_results.is_empty() {
        if !state.query.trim().is_empty() {
            println!("No results");
        }
        return;
    }

    for (i, (candidate, weather)) in state.visible_weather().enumerate() {
        match weather {
            Some(w) => println!(
                "{:>2}. {} - {:.0}°F {}",
                i + 1,
                candidate.display_name(),
                w.current.temp_f,
                w.current.condition.text
            ),
            None => println!("{:>2}. {} - ...", i + 1, candidate.display_name()),
        }
    }
}

fn print_selected(weather: &WeatherSnapshot) {
    let current = &weather.current;
    println!(
        "{}, {} ({})",
        weather.location.name, weather.location.country, weather.location.localtime
    );
    println!(
        "  {:.0}°F {}  humidity {}%  feels like {:.0}°F  UV {:.0}",
        current.temp_f, current.condition.text, current.humidity, current.feelslike_f, current.uv
    );
    println!("  {}", current.condition.icon_url());
    if let Some(observed) = weather.location.observed_at() {
        println!("  observed {}", observed.format("%Y-%m-%d %H:%M UTC"));
    }
}
