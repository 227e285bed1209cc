//! Pk command implementation.

use plugstore_db::Pk;

/// Prints the key derived from `tag` in base64 and hex.
pub fn run(tag: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pk = Pk::try_from_tag(tag)?;
    println!("base64: {pk}");
    println!("hex:    {}", pk.to_hex());
    Ok(())
}
