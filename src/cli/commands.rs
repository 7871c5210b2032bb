use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database, demo tenant and optional super-admin)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,

        /// Email of the platform super-admin to provision
        #[arg(long)]
        superadmin_email: Option<String>,

        /// Company name for the super-admin's tenant
        #[arg(long)]
        company: Option<String>,
    },

    /// Create platform invites with 12-character hex codes
    SeedInvites {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email to invite (repeatable)
        #[arg(long = "email", required = true)]
        emails: Vec<String>,

        /// Company name recorded on the invites
        #[arg(long)]
        company: Option<String>,

        /// Invite lifetime in hours
        #[arg(long, default_value = "168")]
        ttl_hours: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show pending invites and upgrade requests
    Info {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
