//! Prints an argon2 hash for a `[[users]]` entry in the LoginGuard config.

use std::io::{self, Write};

use loginguard_web::auth::password::hash_password;

fn main() -> anyhow::Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim();

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    println!("{}", hash_password(password)?);
    Ok(())
}
