//! # Economy Console
//!
//! Drives the respawn economy against the simulation host from a script on
//! stdin, one event or command per line.
//!
//! ```text
//! join <uid> <name> [admin]       connect and log in
//! leave <name>                    disconnect
//! die <name>                      death event
//! respawn <name>                  respawn attempt
//! items <name> <item> <count>     put materials in the player's inventory
//! as <name> econ <subcommand...>  run a chat command as that player
//! state <name>                    print ledger balance, mirror and items
//! # ...                           comment
//! ```
//!
//! Usage: `econ_console [<config.toml> <ledger.json>]`. Without paths the
//! economy runs on defaults and an in-memory ledger. Logs go to stderr,
//! filtered by `RUST_LOG` (default `info`).

use std::collections::HashMap;
use std::io::{self, BufRead};

use respawn_economy::sim::SimHost;
use respawn_economy::{
    AccountKey, Caller, EconomyConfig, MemoryStore, PlayerRef, RespawnEconomy,
};
use tracing_subscriber::EnvFilter;

struct Console {
    economy: RespawnEconomy,
    host: SimHost,
    players: HashMap<String, Caller>,
}

impl Console {
    fn caller(&self, name: &str) -> Result<&Caller, String> {
        self.players
            .get(&name.to_lowercase())
            .ok_or_else(|| format!("unknown player '{name}' (use join first)"))
    }

    fn run_line(&mut self, line: &str) -> Result<(), String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => Ok(()),
            [first, ..] if first.starts_with('#') => Ok(()),
            ["join", uid, name, rest @ ..] => {
                let player: PlayerRef = self.host.connect(uid, name);
                let caller = if rest.first() == Some(&"admin") {
                    Caller::admin(*uid, *name)
                } else {
                    Caller::player(*uid, *name)
                };
                self.players.insert(name.to_lowercase(), caller);
                let mirror = self
                    .economy
                    .on_player_login(&mut self.host, &player)
                    .map_err(|e| e.to_string())?;
                println!("{name} joined with {} token(s)", mirror.balance);
                Ok(())
            }
            ["leave", name] => {
                let uid = self.caller(name)?.uid.clone();
                self.economy
                    .on_player_disconnect(&uid)
                    .map_err(|e| e.to_string())?;
                self.host.disconnect(&uid);
                println!("{name} left");
                Ok(())
            }
            ["die", name] => {
                let uid = self.caller(name)?.uid.clone();
                self.host.set_dead(&uid, true);
                self.economy
                    .on_player_death(&mut self.host, &uid)
                    .map_err(|e| e.to_string())?;
                self.print_notices();
                Ok(())
            }
            ["respawn", name] => {
                let uid = self.caller(name)?.uid.clone();
                let outcome = self
                    .economy
                    .on_player_respawn(&mut self.host, &uid)
                    .map_err(|e| e.to_string())?;
                if outcome.is_granted() {
                    self.host.set_dead(&uid, false);
                }
                println!("{name}: {outcome:?}");
                self.print_notices();
                Ok(())
            }
            ["items", name, item, count] => {
                let uid = self.caller(name)?.uid.clone();
                let count: u32 = count.parse().map_err(|e| format!("bad count: {e}"))?;
                self.host
                    .give_items(&uid, item, count)
                    .ok_or_else(|| format!("{name} has no free slot"))?;
                println!("{name} now holds {} {item}", self.host.item_count(&uid, item));
                Ok(())
            }
            ["as", name, command @ ..] => {
                let caller = self.caller(name)?.clone();
                let reply = self
                    .economy
                    .handle_line(&mut self.host, &caller, &command.join(" "));
                let mark = if reply.success { "ok" } else { "failed" };
                println!("[{mark}] {name}: {reply}");
                self.print_notices();
                Ok(())
            }
            ["state", name] => {
                let caller = self.caller(name)?;
                let balance = self.economy.ledger().balance(&AccountKey::known(&caller.uid));
                let mirror = self.host.mirror(&caller.uid);
                let config = self.economy.config();
                println!(
                    "{name}: ledger={balance:?} mirror={mirror:?} {}={} {}={}",
                    config.buy.item,
                    self.host.item_count(&caller.uid, &config.buy.item),
                    config.trade.item,
                    self.host.item_count(&caller.uid, &config.trade.item),
                );
                Ok(())
            }
            _ => Err(format!("cannot parse '{line}'")),
        }
    }

    fn print_notices(&mut self) {
        for (uid, notice) in self.host.take_notices() {
            let name = self
                .players
                .values()
                .find(|caller| caller.uid == uid)
                .map_or_else(|| uid.to_string(), |caller| caller.name.clone());
            println!("  -> {name}: {notice}");
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let economy = match args.as_slice() {
        [_] => RespawnEconomy::init(EconomyConfig::default(), MemoryStore::new()),
        [_, config, ledger] => RespawnEconomy::open(config, ledger),
        _ => {
            println!("Usage: econ_console [<config.toml> <ledger.json>]");
            return;
        }
    };
    let economy = match economy {
        Ok(economy) => economy,
        Err(e) => {
            println!("Error: could not start economy: {e}");
            std::process::exit(1);
        }
    };

    let mut console = Console {
        economy,
        host: SimHost::new(),
        players: HashMap::new(),
    };

    for (number, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                println!("Error: could not read stdin: {e}");
                break;
            }
        };
        if let Err(message) = console.run_line(line.trim()) {
            println!("line {}: {message}", number + 1);
        }
    }

    if let Err(e) = console.economy.shutdown() {
        println!("Error: shutdown failed: {e}");
        std::process::exit(1);
    }
}
