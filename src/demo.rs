//! A small fleet of ships used by the interactive console.
//!
//! Exercises scoped addressing:
//! - `fleet.ships` lists every ship
//! - `fleet.ship Aurora.speed 12.5` sets a property through two scope hops
//! - `fleet.ship Aurora.crew.add Ada Pilot` reaches a third scope

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::commands::{CommandDecl, CommandMeta, Module, ParamDecl};
use crate::error::UserError;
use crate::value::{Color, Value};

/// Name of the demo module, usable in `excluded_modules`.
pub const MODULE_NAME: &str = "demo";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Every ship currently launched.
#[derive(Debug, Default)]
pub struct Fleet {
    ships: Mutex<Vec<Arc<Ship>>>,
}

impl Fleet {
    pub fn with_ships<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let fleet = Self::default();
        for name in names {
            fleet.launch(name);
        }
        fleet
    }

    /// Adds a ship, returning false if the name is taken.
    pub fn launch(&self, name: &str) -> bool {
        let mut ships = lock(&self.ships);
        if ships.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return false;
        }
        ships.push(Arc::new(Ship::new(name)));
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<Ship>> {
        lock(&self.ships)
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.ships).iter().map(|s| s.name.clone()).collect()
    }
}

/// A single ship.
#[derive(Debug)]
pub struct Ship {
    name: String,
    speed: Mutex<f64>,
    hull: Mutex<Color>,
    docked: Mutex<bool>,
    crew: Arc<Crew>,
}

impl Ship {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            speed: Mutex::new(0.0),
            hull: Mutex::new(Color::WHITE),
            docked: Mutex::new(true),
            crew: Arc::new(Crew::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn speed(&self) -> f64 {
        *lock(&self.speed)
    }

    pub fn hull(&self) -> Color {
        *lock(&self.hull)
    }

    pub fn crew(&self) -> &Arc<Crew> {
        &self.crew
    }
}

impl fmt::Display for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if *lock(&self.docked) { "docked" } else { "underway" };
        write!(
            f,
            "{} ({state}, speed {}, hull {}, crew of {})",
            self.name,
            self.speed(),
            self.hull(),
            self.crew.len()
        )
    }
}

/// The crew of a ship.
#[derive(Debug, Default)]
pub struct Crew {
    members: Mutex<Vec<(String, String)>>,
}

impl Crew {
    pub fn len(&self) -> usize {
        lock(&self.members).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.members).is_empty()
    }

    pub fn roster(&self) -> Vec<String> {
        lock(&self.members)
            .iter()
            .map(|(name, role)| format!("{name} ({role})"))
            .collect()
    }
}

/// The demo module operating on `fleet`.
pub fn module(fleet: Arc<Fleet>) -> Module {
    Module::new(MODULE_NAME)
        .command(fleet_command(fleet))
        .commands(fleet_commands())
        .commands(ship_commands())
        .commands(crew_commands())
}

fn fleet_command(fleet: Arc<Fleet>) -> CommandDecl {
    CommandDecl::global(
        CommandMeta::new("fleet").help("The fleet. Use as a scope: fleet.ships"),
        vec![],
        move |_| Ok(Some(Value::shared(Arc::clone(&fleet)))),
    )
}

fn fleet_commands() -> Vec<CommandDecl> {
    vec![
        CommandDecl::scoped::<Fleet, _>(
            CommandMeta::new("ships").help("Lists every ship in the fleet"),
            vec![],
            |fleet, inv| {
                for name in fleet.names() {
                    inv.log().log(format!(" {name}"));
                }
                Ok(None)
            },
        ),
        CommandDecl::scoped::<Fleet, _>(
            CommandMeta::new("ship").help("Selects a ship by name"),
            vec![ParamDecl::required::<String>("name")],
            |fleet, inv| {
                let name = inv.arg::<String>(0)?;
                let ship = fleet
                    .get(name)
                    .ok_or_else(|| UserError::rejected(format!("No ship named '{name}'")))?;
                Ok(Some(Value::shared(ship)))
            },
        ),
        CommandDecl::scoped::<Fleet, _>(
            CommandMeta::new("launch").help("Adds a new ship to the fleet"),
            vec![ParamDecl::required::<String>("name")],
            |fleet, inv| {
                let name = inv.arg::<String>(0)?;
                if !fleet.launch(name) {
                    return Err(UserError::rejected(format!("A ship named '{name}' already exists")).into());
                }
                inv.log().log(format!("Launched {name}"));
                Ok(None)
            },
        ),
    ]
}

fn ship_commands() -> Vec<CommandDecl> {
    vec![
        CommandDecl::scoped::<Ship, _>(
            CommandMeta::new("status").help("Shows the state of the ship"),
            vec![],
            |ship, _| Ok(Some(Value::new(ship.to_string()))),
        ),
        CommandDecl::scoped_property::<Ship, f64, _, _>(
            CommandMeta::new("speed")
                .help("Gets or sets the cruising speed")
                .parameter_names(["Knots"]),
            |ship| ship.speed(),
            |ship, speed| *lock(&ship.speed) = speed,
        ),
        CommandDecl::scoped_property::<Ship, Color, _, _>(
            CommandMeta::new("hull").help("Gets or sets the hull color"),
            |ship| ship.hull(),
            |ship, color| *lock(&ship.hull) = color,
        ),
        CommandDecl::scoped::<Ship, _>(
            CommandMeta::new("dock")
                .help("Docks the ship, or casts off with 'dock no'")
                .allow_scoping(false),
            vec![ParamDecl::with_default("docked", true)],
            |ship, inv| {
                let docked = *inv.arg::<bool>(0)?;
                *lock(&ship.docked) = docked;
                if docked {
                    *lock(&ship.speed) = 0.0;
                }
                Ok(None)
            },
        ),
        CommandDecl::scoped_getter::<Ship, Crew, _>(
            CommandMeta::new("crew").help("The crew of the ship. Use as a scope: crew.list"),
            |ship| Some(Value::shared(Arc::clone(ship.crew()))),
        ),
    ]
}

fn crew_commands() -> Vec<CommandDecl> {
    vec![
        CommandDecl::scoped::<Crew, _>(
            CommandMeta::new("list").help("Lists the crew"),
            vec![],
            |crew, inv| {
                if crew.is_empty() {
                    inv.log().log(" (no crew)");
                }
                for member in crew.roster() {
                    inv.log().log(format!(" {member}"));
                }
                Ok(None)
            },
        ),
        CommandDecl::scoped::<Crew, _>(
            CommandMeta::new("add").help("Signs on a crew member"),
            vec![
                ParamDecl::required::<String>("name"),
                ParamDecl::with_default("role", "Deckhand".to_string()),
            ],
            |crew, inv| {
                let name = inv.arg::<String>(0)?.clone();
                let role = inv.arg::<String>(1)?.clone();
                lock(&crew.members).push((name, role));
                Ok(None)
            },
        ),
    ]
}
