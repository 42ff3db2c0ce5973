use clap::{Parser, Subcommand};

/// certflow — approval-gated Jenkins triggers for SSL renewals
#[derive(Parser)]
#[command(name = "certflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the approval server
    Serve {
        /// Port to bind (overrides APPROVAL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage approval tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Inspect TLS certificates
    Cert {
        #[command(subcommand)]
        command: CertCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a new PENDING approval token
    Create {
        /// Domain the approval governs
        #[arg(long)]
        domain: String,
        /// Who requested the renewal
        #[arg(long)]
        owner: String,
        /// Seconds until the token expires
        #[arg(long, default_value = "86400")]
        ttl: i64,
    },
    /// List approval records
    List,
    /// Show one approval record as JSON
    Show { token: String },
}

#[derive(Subcommand)]
pub enum CertCommands {
    /// Check when a host's certificate expires
    Check {
        host: String,
        #[arg(long, default_value = "443")]
        port: u16,
        /// Exit non-zero when at most this many days remain
        #[arg(long, default_value = "30")]
        warn_days: i64,
    },
}
