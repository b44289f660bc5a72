use clap::{Parser, Subcommand};
use outreach_core::{settings_from_env, RecordServices};

#[derive(Parser)]
#[command(name = "outreach")]
#[command(about = "Outreach patient record service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and apply the schema
    InitDb,
    /// Check an identity number and password
    Login {
        /// Identity number, with or without hyphens
        id_card: String,
        /// Password
        password: String,
    },
    /// Show a patient profile
    Profile {
        /// Patient id
        patient_id: i64,
    },
    /// Set a new password for a patient's account
    ChangePassword {
        /// Patient id
        patient_id: i64,
        /// New password
        password: String,
    },
    /// List every dated appointment of an account
    Appointments {
        /// Account id
        account_id: i64,
    },
    /// Show the latest-dated appointment of an account
    Upcoming {
        /// Account id
        account_id: i64,
    },
    /// Delete an appointment or evaluation
    DeleteAppointment {
        /// Appointment id
        appointment_id: i64,
    },
    /// List province names
    Provinces,
    /// List the districts of a province
    Districts {
        /// Province name
        province: String,
    },
    /// List the subdistricts of a district
    Subdistricts {
        /// District name
        district: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'outreach --help' for commands");
        return Ok(());
    };

    let settings = settings_from_env()?;
    let services = RecordServices::open(&settings.core)?;

    match command {
        Commands::InitDb => {
            println!(
                "Database ready at {}",
                settings.core.database_path().display()
            );
        }
        Commands::Login { id_card, password } => {
            match services.identity.login(&id_card, &password) {
                Ok(res) => println!(
                    "Logged in: patient {} (account {}), {} {} {}",
                    res.id, res.account_id, res.title_name, res.first_name, res.last_name
                ),
                Err(e) => eprintln!("Login failed: {}", e),
            }
        }
        Commands::Profile { patient_id } => match services.patients.get_profile(patient_id) {
            Ok(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            Err(e) => eprintln!("Error reading profile: {}", e),
        },
        Commands::ChangePassword {
            patient_id,
            password,
        } => match services.identity.change_password(patient_id, &password) {
            Ok(()) => println!("Password changed for patient {}", patient_id),
            Err(e) => eprintln!("Error changing password: {}", e),
        },
        Commands::Appointments { account_id } => {
            match services.appointments.list_all(account_id) {
                Ok(appointments) if appointments.is_empty() => println!("No appointments found."),
                Ok(appointments) => {
                    for a in appointments {
                        println!(
                            "ID: {}, Program: {}, Date: {}",
                            a.id,
                            a.program_name,
                            a.appointment_date.unwrap_or_default()
                        );
                    }
                }
                Err(e) => eprintln!("Error listing appointments: {}", e),
            }
        }
        Commands::Upcoming { account_id } => {
            match services.appointments.list_upcoming(account_id) {
                Ok(Some(a)) => println!("{}", serde_json::to_string_pretty(&a)?),
                Ok(None) => println!("No appointments found."),
                Err(e) => eprintln!("Error reading appointments: {}", e),
            }
        }
        Commands::DeleteAppointment { appointment_id } => {
            match services.appointments.delete(appointment_id) {
                Ok(true) => println!("Deleted appointment {}", appointment_id),
                Ok(false) => println!("Appointment {} did not exist", appointment_id),
                Err(e) => eprintln!("Error deleting appointment: {}", e),
            }
        }
        Commands::Provinces => {
            for name in services.divisions.provinces() {
                println!("{}", name);
            }
        }
        Commands::Districts { province } => {
            for name in services.divisions.districts_of(&province) {
                println!("{}", name);
            }
        }
        Commands::Subdistricts { district } => {
            for name in services.divisions.subdistricts_of(&district) {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["outreach", "change-password", "7", "new pass"])
            .expect("parse should succeed");
        assert!(matches!(
            cli.command,
            Some(Commands::ChangePassword { patient_id: 7, ref password }) if password == "new pass"
        ));

        let cli = Cli::try_parse_from(["outreach", "init-db"]).expect("parse should succeed");
        assert!(matches!(cli.command, Some(Commands::InitDb)));
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(Cli::try_parse_from(["outreach", "profile", "abc"]).is_err());
    }
}
