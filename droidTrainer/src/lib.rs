// Main module declarations for the Asteroid Droid pretrainer

// Agent components: action space, rule table, heuristic scorer
pub mod agent {
    pub mod actions;
    pub mod heuristic;
    pub mod rules;
}

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod schema;
}

// Data sources: synthetic observations and recorded demonstrations
pub mod data {
    pub mod demonstrations;
    pub mod synthetic;
}

// Policy network and its optimizer
pub mod model {
    pub mod network;
    pub mod optimizer;
}

// Training orchestration
pub mod training {
    pub mod pipeline;
    pub mod session;
}

// Weight artifact interchange
pub mod artifact {
    pub mod weights_io;
}

// Utility functions
pub mod utils {
    pub mod csv_export;
    pub mod logging;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used types
pub use crate::agent::actions::DroidAction;
pub use crate::agent::heuristic::HeuristicPolicy;
pub use crate::artifact::weights_io::ModelArtifact;
pub use crate::config::schema::ObservationSchema;
pub use crate::model::network::PolicyNetwork;
pub use crate::training::session::TrainingSession;
