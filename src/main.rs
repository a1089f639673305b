use std::io::{self, BufRead};

use resonant_mesh::{App, SimulationConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = match App::start(SimulationConfig::default()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Failed to start simulation: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Commands:");
    log::info!("  mesh: Print current mesh state");
    log::info!("  osc: Print current oscillator state");
    log::info!("  report: Print latest feedback report");
    log::info!("  q (or end of input): Quit");

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("stdin error: {}", e);
                break;
            }
        };
        match line.trim() {
            "q" | "quit" => break,
            "mesh" => match app.read_mesh().to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize mesh: {}", e),
            },
            "osc" => match app.read_oscillator().to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize oscillator: {}", e),
            },
            "report" => match app.latest_report() {
                Some(report) => match serde_json::to_string(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => log::error!("Failed to serialize report: {}", e),
                },
                None => log::info!("No feedback report yet"),
            },
            "" => {}
            other => log::warn!("Unknown command: {}", other),
        }
    }

    app.shutdown();
}
