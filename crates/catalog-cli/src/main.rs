// ============================================================================
// pearl-shop — terminal front end for the Pearl Verse avatar shop
// ============================================================================
// Usage:
//   pearl-shop browse [--category banner] [--search reef] [--owned owned]
//   pearl-shop item 42                     Show one item
//   pearl-shop buy 42                      Purchase an item
//   pearl-shop equip 42 / unequip 42       Wear or remove an item
//   pearl-shop reset                       Empty every equip slot
//   pearl-shop config                      Show the equipped configuration
//   pearl-shop featured                    Show the featured rotation
//   pearl-shop balance                     Show the pearl balance
//
// The API base URL comes from --api-url or PEARL_API_URL; the session
// cookie from --session or PEARL_SESSION (a .env file is honored).
// ============================================================================

use anyhow::{anyhow, Result};
use catalog_core::{
    format, CatalogView, CategoryFilter, DisplayPage, FilterUpdate, HttpCatalogClient, Item,
    ItemId, MutationOutcome, OwnershipFilter,
};
use clap::{Parser, Subcommand};

/// Pearl Verse avatar shop browser
#[derive(Parser)]
#[command(name = "pearl-shop", version, about = "Browse and manage the Pearl Verse avatar shop")]
struct Cli {
    /// Base URL of the Pearl Verse backend (default: PEARL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session cookie, e.g. "session=<value>" (default: PEARL_SESSION)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog items for a category/search/ownership slice
    Browse {
        /// Category tab: all, banner, avatar, decoration
        #[arg(long, default_value = "all")]
        category: CategoryFilter,

        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,

        /// Ownership filter: all, owned, unowned
        #[arg(long, default_value = "all")]
        owned: OwnershipFilter,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Show a single item by id
    Item { item_id: ItemId },

    /// Purchase an item
    Buy { item_id: ItemId },

    /// Equip an owned item
    Equip { item_id: ItemId },

    /// Unequip an item
    Unequip { item_id: ItemId },

    /// Reset the equipped configuration (empty every slot)
    Reset,

    /// Show the equipped configuration, slot by slot
    Config,

    /// Show the featured rotation
    Featured,

    /// Show the current pearl balance
    Balance,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let api_url = cli
        .api_url
        .or_else(|| std::env::var("PEARL_API_URL").ok())
        .ok_or_else(|| anyhow!("No API URL. Pass --api-url or set PEARL_API_URL"))?;
    let session = cli.session.or_else(|| std::env::var("PEARL_SESSION").ok());

    let mut client = HttpCatalogClient::new(api_url);
    if let Some(cookie) = session {
        client = client.with_session_cookie(cookie);
    }

    let mut view = CatalogView::new(client);
    view.initialize().await?;

    match cli.command {
        Commands::Browse {
            category,
            search,
            owned,
            page,
        } => cmd_browse(&mut view, category, search, owned, page).await,
        Commands::Item { item_id } => cmd_item(&mut view, item_id).await,
        Commands::Buy { item_id } => cmd_buy(&mut view, item_id).await,
        Commands::Equip { item_id } => cmd_equip(&mut view, item_id).await,
        Commands::Unequip { item_id } => cmd_unequip(&mut view, item_id).await,
        Commands::Reset => cmd_reset(&mut view).await,
        Commands::Config => cmd_config(&mut view).await,
        Commands::Featured => cmd_featured(&mut view).await,
        Commands::Balance => {
            println!("Balance: {} pearls", format::compact(view.balance()));
            Ok(())
        }
    }
}

type ShopView = CatalogView<HttpCatalogClient>;

async fn cmd_browse(
    view: &mut ShopView,
    category: CategoryFilter,
    search: Option<String>,
    owned: OwnershipFilter,
    page: usize,
) -> Result<()> {
    view.set_filter(FilterUpdate {
        category: Some(category),
        search,
        ownership: Some(owned),
        page: None,
    })
    .await?;
    if page > 1 {
        view.set_filter(FilterUpdate::page(page)).await?;
    }

    let display = view.display_page().await?;
    render_page(view, &display);
    Ok(())
}

fn render_page(view: &ShopView, display: &DisplayPage) {
    if let Some(reason) = display.empty {
        println!("{}", reason.message());
        return;
    }

    for item in &display.items {
        let marker = if view.is_equipped(item) {
            "[equipped]"
        } else if item.owned {
            "[owned]"
        } else {
            ""
        };
        println!(
            "{:>6}  {:<28} {:<11} {:<9} {:>10}  {}",
            item.id,
            item.name,
            item.category,
            item.rarity,
            format::price_label(item.price),
            marker
        );
    }
    println!();
    println!(
        "Page {} of {}  ({} pearls)",
        view.filter().page,
        display.total_pages,
        format::compact(view.balance())
    );
}

async fn cmd_item(view: &mut ShopView, item_id: ItemId) -> Result<()> {
    let item = view
        .lookup(item_id)
        .await?
        .ok_or_else(|| anyhow!("Item {} not found", item_id))?;
    print_item(view, &item);
    Ok(())
}

fn print_item(view: &ShopView, item: &Item) {
    println!("Item #{}: {}", item.id, item.name);
    println!("  Category: {}", item.category);
    println!("  Rarity:   {}", item.rarity);
    println!("  Price:    {} {}", format::price_label(item.price), item.currency);
    if let Some(description) = &item.description {
        println!("  {}", description);
    }
    println!("  Image:    {}", item.image_url());
    if view.is_equipped(item) {
        println!("  Status:   equipped");
    } else if item.owned {
        println!("  Status:   owned");
    }
}

async fn cmd_buy(view: &mut ShopView, item_id: ItemId) -> Result<()> {
    let receipt = view.purchase(item_id).await?;
    if let Some(message) = &receipt.message {
        println!("{}", message);
    }
    println!(
        "New balance: {} pearls",
        format::with_separators(receipt.new_balance)
    );

    // Re-fetch the current page so the listing below carries the server's
    // fresh ownership flags, not just the locally marked item.
    view.reload().await?;
    let display = view.display_page().await?;
    render_page(view, &display);
    Ok(())
}

async fn cmd_equip(view: &mut ShopView, item_id: ItemId) -> Result<()> {
    match view.equip(item_id).await? {
        MutationOutcome::Applied { message } => {
            println!("{}", message.unwrap_or_else(|| "Item equipped".to_string()));
        }
        MutationOutcome::NoOp => println!("Nothing to do"),
    }
    Ok(())
}

async fn cmd_unequip(view: &mut ShopView, item_id: ItemId) -> Result<()> {
    match view.unequip(item_id).await? {
        MutationOutcome::Applied { message } => {
            println!("{}", message.unwrap_or_else(|| "Item unequipped".to_string()));
        }
        MutationOutcome::NoOp => println!("Item was not equipped"),
    }
    Ok(())
}

async fn cmd_reset(view: &mut ShopView) -> Result<()> {
    view.reset_configuration().await?;
    println!("All equip slots cleared");
    Ok(())
}

async fn cmd_config(view: &mut ShopView) -> Result<()> {
    let slots: Vec<_> = view.equipped_configuration().iter().collect();
    if slots.is_empty() {
        println!("No items equipped");
        return Ok(());
    }
    for (category, item_id) in slots {
        let name = view
            .lookup(item_id)
            .await?
            .map(|item| item.name)
            .unwrap_or_else(|| format!("item #{}", item_id));
        println!("{:<11} {}", category, name);
    }
    Ok(())
}

async fn cmd_featured(view: &mut ShopView) -> Result<()> {
    let items = view.featured().await?;
    if items.is_empty() {
        println!("No featured items right now");
        return Ok(());
    }
    for item in items {
        println!(
            "{:>6}  {:<28} {:<11} {:>10}",
            item.id,
            item.name,
            item.category,
            format::price_label(item.price)
        );
    }
    Ok(())
}
