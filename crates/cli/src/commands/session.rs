//! Interactive cart session.
//!
//! Reads one command per line from stdin and drives an [`IdentityHub`] and a
//! cart session with it. The cart is printed after every change; background
//! syncing is reported through the log.
//!
//! ```text
//! login <user-key> <email> [display name]
//! register <user-key> <email> <display name>
//! logout
//! profile <display name>
//! add <item-id> <price> <name>
//! remove <item-id>
//! qty <item-id> <quantity>
//! clear | sync | show | help | quit
//! ```

use std::error::Error;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use shopfront_core::{CartState, Email, Item, ItemId, Price, UserKey};
use shopfront_storefront::api_client::ApiClient;
use shopfront_storefront::config::ClientConfig;
use shopfront_storefront::identity::IdentityHub;
use shopfront_storefront::models::{ProfileUpdate, SessionUser};
use shopfront_storefront::persistence::{InMemoryPersistence, Persistence};
use shopfront_storefront::sync::{CartHandle, CartSession};

const HELP: &str = "\
commands:
  login <user-key> <email> [display name]
  register <user-key> <email> <display name>
  logout
  profile <display name>
  add <item-id> <price> <name>
  remove <item-id>
  qty <item-id> <quantity>
  clear | sync | show | help | quit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Login {
        key: UserKey,
        email: Email,
        name: Option<String>,
    },
    Register {
        key: UserKey,
        email: Email,
        name: String,
    },
    Logout,
    Profile(String),
    Add(Item),
    Remove(ItemId),
    Quantity { id: ItemId, quantity: i64 },
    Clear,
    Sync,
    Show,
    Help,
    Quit,
}

/// Why a REPL line could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
enum ParseError {
    #[error("unknown command `{0}`; type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },
}

fn invalid(what: &'static str) -> impl FnOnce(String) -> ParseError {
    move |reason| ParseError::Invalid { what, reason }
}

/// Remaining words joined back into one argument, or `None` if there are none.
fn rest(words: &[&str]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

fn parse(line: &str) -> Result<Command, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Err(ParseError::Usage("help"));
    };

    match (verb, args) {
        ("login", [key, email, name @ ..]) => Ok(Command::Login {
            key: UserKey::parse(key).map_err(|e| invalid("user key")(e.to_string()))?,
            email: Email::parse(email).map_err(|e| invalid("email")(e.to_string()))?,
            name: rest(name),
        }),
        ("login", _) => Err(ParseError::Usage("login <user-key> <email> [display name]")),
        ("register", [key, email, name @ ..]) if !name.is_empty() => Ok(Command::Register {
            key: UserKey::parse(key).map_err(|e| invalid("user key")(e.to_string()))?,
            email: Email::parse(email).map_err(|e| invalid("email")(e.to_string()))?,
            name: name.join(" "),
        }),
        ("register", _) => Err(ParseError::Usage(
            "register <user-key> <email> <display name>",
        )),
        ("logout", []) => Ok(Command::Logout),
        ("profile", name) if !name.is_empty() => Ok(Command::Profile(name.join(" "))),
        ("profile", _) => Err(ParseError::Usage("profile <display name>")),
        ("add", [id, price, name @ ..]) if !name.is_empty() => {
            let amount: Decimal = price
                .parse()
                .map_err(|e: rust_decimal::Error| invalid("price")(e.to_string()))?;
            let price = Price::new(amount).map_err(|e| invalid("price")(e.to_string()))?;
            Ok(Command::Add(Item {
                id: ItemId::from(*id),
                name: name.join(" "),
                price,
                image: String::new(),
                description: String::new(),
                category: String::new(),
            }))
        }
        ("add", _) => Err(ParseError::Usage("add <item-id> <price> <name>")),
        ("remove", [id]) => Ok(Command::Remove(ItemId::from(*id))),
        ("remove", _) => Err(ParseError::Usage("remove <item-id>")),
        ("qty", [id, quantity]) => Ok(Command::Quantity {
            id: ItemId::from(*id),
            quantity: quantity
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("quantity")(e.to_string()))?,
        }),
        ("qty", _) => Err(ParseError::Usage("qty <item-id> <quantity>")),
        ("clear", []) => Ok(Command::Clear),
        ("sync", []) => Ok(Command::Sync),
        ("show", []) => Ok(Command::Show),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        (other, _) => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Run the session until `quit` or end of input.
///
/// # Errors
///
/// Returns error if the client cannot be configured, stdin fails, or the
/// cart session stops unexpectedly.
pub async fn run(api_url: Option<Url>, offline: bool) -> Result<(), Box<dyn Error>> {
    let persistence: Arc<dyn Persistence> = if offline {
        tracing::info!("offline session; carts are kept in memory");
        Arc::new(InMemoryPersistence::new())
    } else {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = api_url {
            config.api_url = url;
        }
        tracing::info!(api_url = %config.api_url, "using persistence API");
        Arc::new(ApiClient::new(&config)?)
    };

    let identity = IdentityHub::new(Arc::clone(&persistence));
    let cart = CartSession::spawn(persistence, identity.subscribe());
    say(HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(command, &identity, &cart).await?,
            Err(e) => say(&e.to_string()),
        }
    }

    cart.shutdown().await?;
    Ok(())
}

async fn execute(
    command: Command,
    identity: &IdentityHub,
    cart: &CartHandle,
) -> Result<(), Box<dyn Error>> {
    let state = match command {
        Command::Login { key, email, name } => {
            identity
                .sign_in(SessionUser::new(key, email, name.as_deref()))
                .await;
            cart.state()
        }
        Command::Register { key, email, name } => {
            match identity.register(key, email, &name).await {
                Ok(user) => say(&format!("registered {}", user.display_name)),
                Err(e) => say(&e.to_string()),
            }
            cart.state()
        }
        Command::Logout => {
            identity.sign_out();
            cart.state()
        }
        Command::Profile(name) => {
            let update = ProfileUpdate {
                name: Some(name),
                ..ProfileUpdate::default()
            };
            match identity.update_profile(update).await {
                Ok(user) => say(&format!("profile updated: {}", user.display_name)),
                Err(e) => say(&e.to_string()),
            }
            return Ok(());
        }
        Command::Add(item) => cart.add(item).await?,
        Command::Remove(id) => cart.remove(id).await?,
        Command::Quantity { id, quantity } => cart.set_quantity(id, quantity).await?,
        Command::Clear => cart.clear().await?,
        Command::Sync => cart.sync_now().await?,
        Command::Show => cart.state(),
        Command::Help => {
            say(HELP);
            return Ok(());
        }
        // Handled by the read loop.
        Command::Quit => return Ok(()),
    };

    say(&render(&state, identity.current().as_ref()));
    Ok(())
}

fn render(cart: &CartState, user: Option<&SessionUser>) -> String {
    let mut out = match user {
        Some(user) => format!("[{} <{}>]", user.display_name, user.email),
        None => "[anonymous]".to_string(),
    };
    if cart.loading() {
        out.push_str(" loading");
    }
    if cart.syncing() {
        out.push_str(" syncing");
    }

    if cart.is_empty() {
        out.push_str("\n  (cart is empty)");
    }
    for line in cart.lines() {
        out.push_str(&format!(
            "\n  {:>3} x {} ({}) {} = ${:.2}",
            line.quantity,
            line.item.name,
            line.item.id,
            line.item.price,
            line.subtotal().unwrap_or_default()
        ));
    }
    out.push_str(&format!(
        "\n  {} item(s), total ${:.2}",
        cart.item_count(),
        cart.total()
    ));
    out
}

#[allow(clippy::print_stdout)]
fn say(text: &str) {
    println!("{text}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_with_and_without_name() {
        let Command::Login { key, name, .. } = parse("login uid-1 ada@example.com Ada L").unwrap()
        else {
            panic!("expected login");
        };
        assert_eq!(key.as_str(), "uid-1");
        assert_eq!(name.as_deref(), Some("Ada L"));

        assert!(matches!(
            parse("login uid-1 ada@example.com").unwrap(),
            Command::Login { name: None, .. }
        ));
    }

    #[test]
    fn test_parse_register_requires_name() {
        assert!(matches!(
            parse("register uid-1 ada@example.com"),
            Err(ParseError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_add() {
        let Command::Add(item) = parse("add 7 12.50 Blue Mug").unwrap() else {
            panic!("expected add");
        };
        assert_eq!(item.id, ItemId::from("7"));
        assert_eq!(item.name, "Blue Mug");
        assert_eq!(item.price.amount(), Decimal::new(1250, 2));
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        assert!(matches!(
            parse("add 7 -1 Mug"),
            Err(ParseError::Invalid { what: "price", .. })
        ));
    }

    #[test]
    fn test_parse_qty_allows_zero_and_negative() {
        assert_eq!(
            parse("qty 7 -3").unwrap(),
            Command::Quantity {
                id: ItemId::from("7"),
                quantity: -3
            }
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse("checkout"),
            Err(ParseError::Unknown("checkout".to_string()))
        );
    }

    #[test]
    fn test_render_empty_anonymous_cart() {
        let rendered = render(&CartState::new(), None);
        assert!(rendered.starts_with("[anonymous]"));
        assert!(rendered.contains("cart is empty"));
        assert!(rendered.contains("total $0.00"));
    }
}
