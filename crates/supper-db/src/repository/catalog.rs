//! # Catalog Repository
//!
//! Read-only snapshot loads from the catalog tables. Catalog management
//! itself (CRUD, imports) belongs to an external collaborator; this
//! repository only reads what pricing needs.

use sqlx::PgPool;

use crate::error::DbResult;
use supper_core::money::Quantity;
use supper_core::{DinnerDefaultItem, DinnerOption, DinnerType, ItemOption, MenuItem, PriceMode, ServingStyle};

/// Repository for catalog snapshot reads.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: String,
    code: String,
    name: String,
    base_price_cents: i64,
    is_active: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(r: MenuItemRow) -> Self {
        MenuItem {
            id: r.id,
            code: r.code,
            name: r.name,
            base_price_cents: r.base_price_cents,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemOptionRow {
    id: String,
    name: String,
    group_name: String,
    group_item_id: String,
    group_price_mode: String,
    price_delta_cents: i64,
    multiplier_millis: Option<i64>,
}

impl From<ItemOptionRow> for ItemOption {
    fn from(r: ItemOptionRow) -> Self {
        ItemOption {
            id: r.id,
            name: r.name,
            group_name: r.group_name,
            group_item_id: r.group_item_id,
            group_price_mode: PriceMode::parse(&r.group_price_mode),
            price_delta_cents: r.price_delta_cents,
            multiplier_millis: r.multiplier_millis,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DinnerTypeRow {
    id: String,
    code: String,
    name: String,
    base_price_cents: i64,
    is_active: bool,
}

impl From<DinnerTypeRow> for DinnerType {
    fn from(r: DinnerTypeRow) -> Self {
        DinnerType {
            id: r.id,
            code: r.code,
            name: r.name,
            base_price_cents: r.base_price_cents,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ServingStyleRow {
    id: String,
    code: String,
    name: String,
    price_mode: String,
    value_cents: i64,
    value_millis: Option<i64>,
}

impl From<ServingStyleRow> for ServingStyle {
    fn from(r: ServingStyleRow) -> Self {
        ServingStyle {
            id: r.id,
            code: r.code,
            name: r.name,
            price_mode: PriceMode::parse(&r.price_mode),
            value_cents: r.value_cents,
            value_millis: r.value_millis,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DinnerOptionRow {
    id: String,
    name: String,
    group_name: String,
    group_dinner_type_id: String,
    group_price_mode: String,
    price_delta_cents: i64,
    multiplier_millis: Option<i64>,
    linked_item_name: Option<String>,
}

impl From<DinnerOptionRow> for DinnerOption {
    fn from(r: DinnerOptionRow) -> Self {
        DinnerOption {
            id: r.id,
            name: r.name,
            group_name: r.group_name,
            group_dinner_type_id: r.group_dinner_type_id,
            group_price_mode: PriceMode::parse(&r.group_price_mode),
            price_delta_cents: r.price_delta_cents,
            multiplier_millis: r.multiplier_millis,
            linked_item_name: r.linked_item_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DefaultItemRow {
    item_id: String,
    item_code: String,
    item_name: String,
    item_base_price_cents: i64,
    default_qty_hundredths: i64,
    included_in_base: bool,
}

impl From<DefaultItemRow> for DinnerDefaultItem {
    fn from(r: DefaultItemRow) -> Self {
        DinnerDefaultItem {
            item_id: r.item_id,
            item_code: r.item_code,
            item_name: r.item_name,
            item_base_price_cents: r.item_base_price_cents,
            default_qty: Quantity::from_hundredths(r.default_qty_hundredths),
            included_in_base: r.included_in_base,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: PgPool) -> Self {
        CatalogRepository { pool }
    }

    /// Checks that a customer exists.
    pub async fn customer_exists(&self, customer_id: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1)")
                .bind(customer_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Gets an active dinner type by code.
    pub async fn active_dinner_by_code(&self, code: &str) -> DbResult<Option<DinnerType>> {
        let row = sqlx::query_as::<_, DinnerTypeRow>(
            r#"
            SELECT id, code, name, base_price_cents, is_active
            FROM dinner_types
            WHERE code = $1 AND is_active = TRUE
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Gets a serving style by code.
    pub async fn style_by_code(&self, code: &str) -> DbResult<Option<ServingStyle>> {
        let row = sqlx::query_as::<_, ServingStyleRow>(
            r#"
            SELECT id, code, name, price_mode, value_cents, value_millis
            FROM serving_styles
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Checks the allowed (dinner, style) relation.
    pub async fn style_allowed(&self, dinner_type_id: &str, style_id: &str) -> DbResult<bool> {
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM dinner_style_allowed
                WHERE dinner_type_id = $1 AND style_id = $2
            )
            "#,
        )
        .bind(dinner_type_id)
        .bind(style_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    /// Fetches dinner options by id, flattened with their group and linked
    /// item name. Returns only rows that exist; ownership is validated by
    /// the pricing engine.
    pub async fn dinner_options_by_ids(&self, ids: &[String]) -> DbResult<Vec<DinnerOption>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, DinnerOptionRow>(
            r#"
            SELECT
                o.id,
                o.name,
                g.name AS group_name,
                g.dinner_type_id AS group_dinner_type_id,
                g.price_mode AS group_price_mode,
                o.price_delta_cents,
                o.multiplier_millis,
                mi.name AS linked_item_name
            FROM dinner_options o
            JOIN dinner_option_groups g ON g.id = o.group_id
            LEFT JOIN menu_items mi ON mi.id = o.linked_item_id
            WHERE o.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Fetches a dinner's default items, ordered by item name.
    pub async fn default_items(&self, dinner_type_id: &str) -> DbResult<Vec<DinnerDefaultItem>> {
        let rows = sqlx::query_as::<_, DefaultItemRow>(
            r#"
            SELECT
                mi.id AS item_id,
                mi.code AS item_code,
                mi.name AS item_name,
                mi.base_price_cents AS item_base_price_cents,
                d.default_qty_hundredths,
                d.included_in_base
            FROM dinner_default_items d
            JOIN menu_items mi ON mi.id = d.item_id
            WHERE d.dinner_type_id = $1
            ORDER BY mi.name
            "#,
        )
        .bind(dinner_type_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Gets an active menu item by code.
    pub async fn active_item_by_code(&self, code: &str) -> DbResult<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, code, name, base_price_cents, is_active
            FROM menu_items
            WHERE code = $1 AND is_active = TRUE
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Fetches item options by id, flattened with their group. Returns only
    /// rows that exist; ownership is validated by the pricing engine.
    pub async fn item_options_by_ids(&self, ids: &[String]) -> DbResult<Vec<ItemOption>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ItemOptionRow>(
            r#"
            SELECT
                o.id,
                o.name,
                g.name AS group_name,
                g.item_id AS group_item_id,
                g.price_mode AS group_price_mode,
                o.price_delta_cents,
                o.multiplier_millis
            FROM item_options o
            JOIN item_option_groups g ON g.id = o.group_id
            WHERE o.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
