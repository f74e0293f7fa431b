//! User command implementations.

use super::{sign_in, Credentials};
use medialab_lab::NewUser;
use std::path::Path;

/// Creates or replaces an account.
pub async fn add(path: &Path, credentials: &Credentials, new: NewUser) -> Result<(), Box<dyn std::error::Error>> {
    let (lab, session) = sign_in(path, credentials).await?;
    let user = lab.save_user(&session, new).await?;
    lab.close().await?;
    println!("✓ Saved {} ({})", user.email, user.role);
    Ok(())
}

/// Lists every account.
pub async fn list(path: &Path, credentials: &Credentials) -> Result<(), Box<dyn std::error::Error>> {
    let (lab, session) = sign_in(path, credentials).await?;
    let users = lab.list_users(&session).await?;
    lab.close().await?;

    for user in &users {
        match &user.guardian_of {
            Some(student) => println!("{:<9} {:<32} {} (guardian of {})", user.role, user.email, user.name, student),
            None => println!("{:<9} {:<32} {}", user.role, user.email, user.name),
        }
    }
    println!();
    println!("{} account(s)", users.len());
    Ok(())
}

/// Deletes an account and its project.
pub async fn remove(path: &Path, credentials: &Credentials, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (lab, session) = sign_in(path, credentials).await?;
    lab.delete_user(&session, email).await?;
    lab.close().await?;
    println!("✓ Removed {email}");
    Ok(())
}
