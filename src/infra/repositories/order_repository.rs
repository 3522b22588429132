//! Order repository: headers, lines and status history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::order::{self, Entity as OrderEntity};
use super::entities::order_item::{self, Entity as OrderItemEntity};
use super::entities::order_status_history::{self, Entity as HistoryEntity};
use super::entities::parse_column;
use crate::domain::order::PricedLine;
use crate::domain::{Channel, NewOrder, Order, OrderFilter, OrderItem, OrderStatus, StatusChange};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Order repository. Every query is scoped to a store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Order>>;

    /// Filtered page, newest first, plus total count
    async fn list(
        &self,
        store_id: Uuid,
        filter: OrderFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Order>, u64)>;

    /// Status history, oldest first
    async fn history(&self, order_id: Uuid) -> AppResult<Vec<StatusChange>>;

    /// Orders created in `[from, to)` for one channel, oldest first
    async fn list_created_between(
        &self,
        store_id: Uuid,
        channel: Channel,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>>;

    async fn count_by_status(&self, store_id: Uuid) -> AppResult<Vec<(OrderStatus, u64)>>;

    /// Sum of order totals per channel, excluding reversed orders
    async fn revenue_by_channel(&self, store_id: Uuid) -> AppResult<Vec<(Channel, Decimal)>>;
}

pub struct OrderStore {
    db: DatabaseConnection,
}

impl OrderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for OrderStore {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Order>> {
        let header = OrderEntity::find_by_id(id)
            .filter(order::Column::StoreId.eq(store_id))
            .one(&self.db)
            .await?;

        match header {
            Some(header) => with_items(&self.db, vec![header]).await.map(|mut v| v.pop()),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        store_id: Uuid,
        filter: OrderFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Order>, u64)> {
        let mut query = OrderEntity::find().filter(order::Column::StoreId.eq(store_id));

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.as_str()));
        }
        if let Some(channel) = filter.channel {
            query = query.filter(order::Column::Channel.eq(channel.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(order::Column::OrderNumber.eq(search.to_uppercase()))
                    .add(
                        Expr::expr(Func::lower(Expr::col(order::Column::CustomerName)))
                            .like(pattern.as_str()),
                    ),
            );
        }
        if let Some(from) = filter.from {
            query = query.filter(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(order::Column::CreatedAt.lt(to));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&self.db, pagination.limit());
        let total = paginator.num_items().await?;
        let headers = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

        Ok((with_items(&self.db, headers).await?, total))
    }

    async fn history(&self, order_id: Uuid) -> AppResult<Vec<StatusChange>> {
        let models = HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(StatusChange::try_from).collect()
    }

    async fn list_created_between(
        &self,
        store_id: Uuid,
        channel: Channel,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        let headers = OrderEntity::find()
            .filter(order::Column::StoreId.eq(store_id))
            .filter(order::Column::Channel.eq(channel.as_str()))
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lt(to))
            .order_by_asc(order::Column::CreatedAt)
            .all(&self.db)
            .await?;

        with_items(&self.db, headers).await
    }

    async fn count_by_status(&self, store_id: Uuid) -> AppResult<Vec<(OrderStatus, u64)>> {
        let rows: Vec<(String, i64)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col(order::Column::Id).count(), "count")
            .filter(order::Column::StoreId.eq(store_id))
            .group_by(order::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|(status, count)| {
                let status = parse_column(&status, "order status", OrderStatus::parse)?;
                Ok((status, count.max(0) as u64))
            })
            .collect()
    }

    async fn revenue_by_channel(&self, store_id: Uuid) -> AppResult<Vec<(Channel, Decimal)>> {
        let reversed: Vec<&str> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_reversed())
            .map(|s| s.as_str())
            .collect();

        let rows: Vec<(String, Option<Decimal>)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Channel)
            .column_as(Expr::col(order::Column::Total).sum(), "revenue")
            .filter(order::Column::StoreId.eq(store_id))
            .filter(order::Column::Status.is_not_in(reversed))
            .group_by(order::Column::Channel)
            .into_tuple()
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|(channel, revenue)| {
                let channel = parse_column(&channel, "order channel", Channel::parse)?;
                Ok((channel, revenue.unwrap_or_default()))
            })
            .collect()
    }
}

/// Transaction-aware order repository.
pub struct TxOrderRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxOrderRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Load and lock an order header, with its lines.
    pub async fn lock(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Order>> {
        let header = OrderEntity::find_by_id(id)
            .filter(order::Column::StoreId.eq(store_id))
            .lock_exclusive()
            .one(self.txn)
            .await?;

        match header {
            Some(header) => with_items(self.txn, vec![header]).await.map(|mut v| v.pop()),
            None => Ok(None),
        }
    }

    /// Insert header and lines.
    pub async fn create(
        &self,
        id: Uuid,
        order_number: String,
        status: OrderStatus,
        header: NewOrder,
        lines: &[PricedLine],
    ) -> AppResult<Order> {
        let now = Utc::now();
        let model = order::ActiveModel {
            id: Set(id),
            store_id: Set(header.store_id),
            order_number: Set(order_number),
            channel: Set(header.channel.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            warehouse_id: Set(header.warehouse_id),
            customer_name: Set(header.customer.name),
            customer_email: Set(header.customer.email),
            customer_phone: Set(header.customer.phone),
            shipping_address: Set(header.customer.shipping_address),
            subtotal: Set(header.subtotal),
            discount_total: Set(header.discount_total),
            total: Set(header.total),
            promotion_id: Set(header.promotion_id),
            promotion_code: Set(header.promotion_code),
            payment_method: Set(header.payment_method.map(|m| m.as_str().to_string())),
            amount_tendered: Set(header.amount_tendered),
            change_due: Set(header.change_due),
            note: Set(header.note),
            created_by: Set(header.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(id),
                product_id: Set(line.product_id),
                sku: Set(line.sku.clone()),
                name: Set(line.name.clone()),
                unit_price: Set(line.unit_price),
                quantity: Set(line.quantity),
                line_total: Set(line.line_total()),
            }
            .insert(self.txn)
            .await?;
            items.push(OrderItem::from(item));
        }

        model.into_domain(items)
    }

    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> AppResult<()> {
        let result = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(status.as_str()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(id))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Append a status history row.
    pub async fn record_status(
        &self,
        order_id: Uuid,
        from: Option<OrderStatus>,
        to: OrderStatus,
        changed_by: Option<Uuid>,
        note: Option<String>,
    ) -> AppResult<StatusChange> {
        let model = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(from.map(|s| s.as_str().to_string())),
            to_status: Set(to.as_str().to_string()),
            changed_by: Set(changed_by),
            note: Set(note),
            created_at: Set(Utc::now()),
        }
        .insert(self.txn)
        .await?;

        StatusChange::try_from(model)
    }
}

/// Load lines for a batch of headers and assemble the aggregates.
async fn with_items<C: ConnectionTrait>(
    conn: &C,
    headers: Vec<order::Model>,
) -> AppResult<Vec<Order>> {
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
    let mut items: Vec<order_item::Model> = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(ids))
        .order_by_asc(order_item::Column::Sku)
        .all(conn)
        .await?;

    headers
        .into_iter()
        .map(|header| {
            let (mine, rest): (Vec<_>, Vec<_>) =
                items.drain(..).partition(|item| item.order_id == header.id);
            items = rest;
            header.into_domain(mine.into_iter().map(OrderItem::from).collect())
        })
        .collect()
}
