//! Railway network simulation.

pub mod clock;
pub mod topology;
pub mod router;
pub mod network;
pub mod train;
pub mod switch;
pub mod failure;
pub mod repair;

use crate::eventsim;
use self::network::Network;
pub type Sim<'a> = eventsim::Simulation<Network<'a>>;
