use anyhow::Result;

use crate::args::{Cli, Command};
use crate::io::input;

mod check;
mod edit;
mod evaluate;
mod phases;
mod progress;
mod sort;
mod unfold;

pub fn dispatch(cli: Cli) -> Result<()> {
    let cfg = input::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check { nodes } => check::run(&cfg, &nodes),
        Command::Sort { nodes } => sort::run(&cfg, &nodes),
        Command::Phases { nodes } => phases::run(&cfg, &nodes),
        Command::Unfold { nodes, unit, phase } => unfold::run(&cfg, &nodes, &unit, phase),
        Command::Progress {
            nodes,
            unit_progress,
            annotations,
        } => progress::run(&cfg, &nodes, &unit_progress, annotations.as_deref()),
        Command::Evaluate {
            unit,
            annotations,
            damage,
            max_damage,
        } => evaluate::run(&cfg, &unit, &annotations, damage, max_damage),
        Command::Move { nodes, node, parent, slot } => edit::run_move(&cfg, &nodes, node, parent, slot),
        Command::Delete { nodes, node, recursive } => edit::run_delete(&cfg, &nodes, node, recursive),
    }
}
