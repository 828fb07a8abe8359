//! redb-based entity store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | one per entity (`baskets`, `orders`, ...) | `id` | JSON row | primary rows |
//! | one per ownership edge (`items_by_basket`, ...) | `(parent, child)` | `()` | child lookup |
//! | `order_by_basket` | `basket_id` | `order_id` | basket → order back-reference |
//! | `shipment_item_by_basket_item` | `basket_item_id` | `shipment_item_id` | cascade-delete lookup |
//! | `package_item_by_basket_item` | `basket_item_id` | `package_item_id` | cascade-delete lookup |
//! | `history` | `(order_id, seq)` | JSON row | append-only audit trail |
//! | `sequence` | `"id"` / `"history"` | `u64` | counters |
//!
//! # Durability
//!
//! One write transaction per outermost mutating operation; a transaction
//! dropped without commit leaves the database untouched, which is what makes
//! cascade failures atomic.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Basket, BasketItem, Delivery, HistoryRecord, Order, OrderComment, OrderReturn,
    OrderReturnItem, Payment, PaymentReceipt, Shipment, ShipmentItem, ShipmentPackage,
    ShipmentPackageItem,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

type RowTable = TableDefinition<'static, u64, &'static [u8]>;
type EdgeTable = TableDefinition<'static, (u64, u64), ()>;

// ========== Primary entity tables ==========
const BASKETS: RowTable = TableDefinition::new("baskets");
const BASKET_ITEMS: RowTable = TableDefinition::new("basket_items");
const ORDERS: RowTable = TableDefinition::new("orders");
const PAYMENTS: RowTable = TableDefinition::new("payments");
const RECEIPTS: RowTable = TableDefinition::new("payment_receipts");
const DELIVERIES: RowTable = TableDefinition::new("deliveries");
const SHIPMENTS: RowTable = TableDefinition::new("shipments");
const SHIPMENT_ITEMS: RowTable = TableDefinition::new("shipment_items");
const PACKAGES: RowTable = TableDefinition::new("shipment_packages");
const PACKAGE_ITEMS: RowTable = TableDefinition::new("package_items");
const RETURNS: RowTable = TableDefinition::new("order_returns");
const RETURN_ITEMS: RowTable = TableDefinition::new("return_items");
const COMMENTS: RowTable = TableDefinition::new("order_comments");

// ========== Ownership edge tables ==========
const ITEMS_BY_BASKET: EdgeTable = TableDefinition::new("items_by_basket");
const PAYMENTS_BY_ORDER: EdgeTable =
    TableDefinition::new("payments_by_order");
const RECEIPTS_BY_PAYMENT: EdgeTable =
    TableDefinition::new("receipts_by_payment");
const DELIVERIES_BY_ORDER: EdgeTable =
    TableDefinition::new("deliveries_by_order");
const SHIPMENTS_BY_DELIVERY: EdgeTable =
    TableDefinition::new("shipments_by_delivery");
const ITEMS_BY_SHIPMENT: EdgeTable =
    TableDefinition::new("items_by_shipment");
const PACKAGES_BY_SHIPMENT: EdgeTable =
    TableDefinition::new("packages_by_shipment");
const ITEMS_BY_PACKAGE: EdgeTable = TableDefinition::new("items_by_package");
const RETURNS_BY_ORDER: EdgeTable = TableDefinition::new("returns_by_order");
const RETURN_ITEMS_BY_RETURN: EdgeTable =
    TableDefinition::new("return_items_by_return");
const COMMENTS_BY_ORDER: EdgeTable =
    TableDefinition::new("comments_by_order");

// ========== Back-reference tables ==========
const ORDER_BY_BASKET: TableDefinition<u64, u64> = TableDefinition::new("order_by_basket");
const SHIPMENT_ITEM_BY_BASKET_ITEM: TableDefinition<u64, u64> =
    TableDefinition::new("shipment_item_by_basket_item");
const PACKAGE_ITEM_BY_BASKET_ITEM: TableDefinition<u64, u64> =
    TableDefinition::new("package_item_by_basket_item");

// ========== History and counters ==========
const HISTORY: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("history");
const SEQUENCE: TableDefinition<&str, u64> = TableDefinition::new("sequence");

const ID_KEY: &str = "id";
const HISTORY_KEY: &str = "history";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("entity row has no id (save through the unit of work)")]
    MissingId,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity store backed by redb
#[derive(Clone)]
pub struct EntityStore {
    db: Arc<Database>,
}

impl EntityStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory store (test harnesses and ephemeral tooling).
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Create all tables up front so read transactions never hit a missing
    /// table.
    fn init_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(BASKETS)?;
            let _ = txn.open_table(BASKET_ITEMS)?;
            let _ = txn.open_table(ORDERS)?;
            let _ = txn.open_table(PAYMENTS)?;
            let _ = txn.open_table(RECEIPTS)?;
            let _ = txn.open_table(DELIVERIES)?;
            let _ = txn.open_table(SHIPMENTS)?;
            let _ = txn.open_table(SHIPMENT_ITEMS)?;
            let _ = txn.open_table(PACKAGES)?;
            let _ = txn.open_table(PACKAGE_ITEMS)?;
            let _ = txn.open_table(RETURNS)?;
            let _ = txn.open_table(RETURN_ITEMS)?;
            let _ = txn.open_table(COMMENTS)?;
            let _ = txn.open_table(ITEMS_BY_BASKET)?;
            let _ = txn.open_table(PAYMENTS_BY_ORDER)?;
            let _ = txn.open_table(RECEIPTS_BY_PAYMENT)?;
            let _ = txn.open_table(DELIVERIES_BY_ORDER)?;
            let _ = txn.open_table(SHIPMENTS_BY_DELIVERY)?;
            let _ = txn.open_table(ITEMS_BY_SHIPMENT)?;
            let _ = txn.open_table(PACKAGES_BY_SHIPMENT)?;
            let _ = txn.open_table(ITEMS_BY_PACKAGE)?;
            let _ = txn.open_table(RETURNS_BY_ORDER)?;
            let _ = txn.open_table(RETURN_ITEMS_BY_RETURN)?;
            let _ = txn.open_table(COMMENTS_BY_ORDER)?;
            let _ = txn.open_table(ORDER_BY_BASKET)?;
            let _ = txn.open_table(SHIPMENT_ITEM_BY_BASKET_ITEM)?;
            let _ = txn.open_table(PACKAGE_ITEM_BY_BASKET_ITEM)?;
            let _ = txn.open_table(HISTORY)?;
            let mut seq = txn.open_table(SEQUENCE)?;
            if seq.get(ID_KEY)?.is_none() {
                seq.insert(ID_KEY, 0u64)?;
            }
            if seq.get(HISTORY_KEY)?.is_none() {
                seq.insert(HISTORY_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction (single writer; the outermost operation owns
    /// it for its whole cascade).
    pub fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counters ==========

    /// Allocate a fresh entity id.
    pub fn next_id(&self, txn: &WriteTransaction) -> StoreResult<u64> {
        self.bump(txn, ID_KEY)
    }

    /// Allocate the next history sequence number.
    pub fn next_history_seq(&self, txn: &WriteTransaction) -> StoreResult<u64> {
        self.bump(txn, HISTORY_KEY)
    }

    fn bump(&self, txn: &WriteTransaction, key: &str) -> StoreResult<u64> {
        let mut table = txn.open_table(SEQUENCE)?;
        let next = table.get(key)?.map(|g| g.value()).unwrap_or(0) + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Generic row helpers ==========

    fn put_row<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        table: RowTable,
        id: u64,
        entity: &T,
    ) -> StoreResult<()> {
        if id == 0 {
            return Err(StoreError::MissingId);
        }
        let mut t = txn.open_table(table)?;
        let value = serde_json::to_vec(entity)?;
        t.insert(id, value.as_slice())?;
        Ok(())
    }

    fn get_row<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        table: RowTable,
        id: u64,
    ) -> StoreResult<Option<T>> {
        let t = txn.open_table(table)?;
        match t.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn del_row(
        &self,
        txn: &WriteTransaction,
        table: RowTable,
        id: u64,
    ) -> StoreResult<()> {
        let mut t = txn.open_table(table)?;
        t.remove(id)?;
        Ok(())
    }

    fn add_edge(
        &self,
        txn: &WriteTransaction,
        table: EdgeTable,
        parent: u64,
        child: u64,
    ) -> StoreResult<()> {
        let mut t = txn.open_table(table)?;
        t.insert((parent, child), ())?;
        Ok(())
    }

    fn del_edge(
        &self,
        txn: &WriteTransaction,
        table: EdgeTable,
        parent: u64,
        child: u64,
    ) -> StoreResult<()> {
        let mut t = txn.open_table(table)?;
        t.remove((parent, child))?;
        Ok(())
    }

    /// Child ids under a parent, in insertion-id order.
    fn children(
        &self,
        txn: &WriteTransaction,
        table: EdgeTable,
        parent: u64,
    ) -> StoreResult<Vec<u64>> {
        let t = txn.open_table(table)?;
        let mut ids = Vec::new();
        for entry in t.range((parent, 0u64)..=(parent, u64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    fn read_row<T: DeserializeOwned>(
        &self,
        table: RowTable,
        id: u64,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;
        match t.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn read_children(
        &self,
        table: EdgeTable,
        parent: u64,
    ) -> StoreResult<Vec<u64>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;
        let mut ids = Vec::new();
        for entry in t.range((parent, 0u64)..=(parent, u64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    // ========== Baskets ==========

    pub fn put_basket(&self, txn: &WriteTransaction, basket: &Basket) -> StoreResult<()> {
        self.put_row(txn, BASKETS, basket.id, basket)
    }

    pub fn get_basket(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<Basket>> {
        self.get_row(txn, BASKETS, id)
    }

    pub fn remove_basket(&self, txn: &WriteTransaction, basket: &Basket) -> StoreResult<()> {
        self.del_row(txn, BASKETS, basket.id)
    }

    pub fn load_basket(&self, id: u64) -> StoreResult<Option<Basket>> {
        self.read_row(BASKETS, id)
    }

    // ========== Basket items ==========

    pub fn put_basket_item(&self, txn: &WriteTransaction, item: &BasketItem) -> StoreResult<()> {
        self.put_row(txn, BASKET_ITEMS, item.id, item)?;
        self.add_edge(txn, ITEMS_BY_BASKET, item.basket_id, item.id)
    }

    pub fn get_basket_item(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<BasketItem>> {
        self.get_row(txn, BASKET_ITEMS, id)
    }

    pub fn remove_basket_item(&self, txn: &WriteTransaction, item: &BasketItem) -> StoreResult<()> {
        self.del_row(txn, BASKET_ITEMS, item.id)?;
        self.del_edge(txn, ITEMS_BY_BASKET, item.basket_id, item.id)
    }

    pub fn items_for_basket(
        &self,
        txn: &WriteTransaction,
        basket_id: u64,
    ) -> StoreResult<Vec<BasketItem>> {
        let ids = self.children(txn, ITEMS_BY_BASKET, basket_id)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.get_row(txn, BASKET_ITEMS, id)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    pub fn load_basket_item(&self, id: u64) -> StoreResult<Option<BasketItem>> {
        self.read_row(BASKET_ITEMS, id)
    }

    pub fn load_items_for_basket(&self, basket_id: u64) -> StoreResult<Vec<BasketItem>> {
        let ids = self.read_children(ITEMS_BY_BASKET, basket_id)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.read_row(BASKET_ITEMS, id)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    // ========== Orders ==========

    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StoreResult<()> {
        self.put_row(txn, ORDERS, order.id, order)?;
        let mut t = txn.open_table(ORDER_BY_BASKET)?;
        t.insert(order.basket_id, order.id)?;
        Ok(())
    }

    pub fn get_order(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<Order>> {
        self.get_row(txn, ORDERS, id)
    }

    pub fn remove_order(&self, txn: &WriteTransaction, order: &Order) -> StoreResult<()> {
        self.del_row(txn, ORDERS, order.id)?;
        let mut t = txn.open_table(ORDER_BY_BASKET)?;
        t.remove(order.basket_id)?;
        Ok(())
    }

    /// Order id owning the given basket, if any.
    pub fn order_for_basket(&self, txn: &WriteTransaction, basket_id: u64) -> StoreResult<Option<u64>> {
        let t = txn.open_table(ORDER_BY_BASKET)?;
        Ok(t.get(basket_id)?.map(|g| g.value()))
    }

    pub fn load_order(&self, id: u64) -> StoreResult<Option<Order>> {
        self.read_row(ORDERS, id)
    }

    // ========== Payments ==========

    pub fn put_payment(&self, txn: &WriteTransaction, payment: &Payment) -> StoreResult<()> {
        self.put_row(txn, PAYMENTS, payment.id, payment)?;
        self.add_edge(txn, PAYMENTS_BY_ORDER, payment.order_id, payment.id)
    }

    pub fn get_payment(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<Payment>> {
        self.get_row(txn, PAYMENTS, id)
    }

    pub fn remove_payment(&self, txn: &WriteTransaction, payment: &Payment) -> StoreResult<()> {
        self.del_row(txn, PAYMENTS, payment.id)?;
        self.del_edge(txn, PAYMENTS_BY_ORDER, payment.order_id, payment.id)
    }

    pub fn payments_for_order(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StoreResult<Vec<Payment>> {
        let ids = self.children(txn, PAYMENTS_BY_ORDER, order_id)?;
        let mut payments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.get_row(txn, PAYMENTS, id)? {
                payments.push(p);
            }
        }
        Ok(payments)
    }

    pub fn load_payment(&self, id: u64) -> StoreResult<Option<Payment>> {
        self.read_row(PAYMENTS, id)
    }

    pub fn load_payments_for_order(&self, order_id: u64) -> StoreResult<Vec<Payment>> {
        let ids = self.read_children(PAYMENTS_BY_ORDER, order_id)?;
        let mut payments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.read_row(PAYMENTS, id)? {
                payments.push(p);
            }
        }
        Ok(payments)
    }

    // ========== Receipts ==========

    pub fn put_receipt(&self, txn: &WriteTransaction, receipt: &PaymentReceipt) -> StoreResult<()> {
        self.put_row(txn, RECEIPTS, receipt.id, receipt)?;
        self.add_edge(txn, RECEIPTS_BY_PAYMENT, receipt.payment_id, receipt.id)
    }

    pub fn get_receipt(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<PaymentReceipt>> {
        self.get_row(txn, RECEIPTS, id)
    }

    pub fn remove_receipt(&self, txn: &WriteTransaction, receipt: &PaymentReceipt) -> StoreResult<()> {
        self.del_row(txn, RECEIPTS, receipt.id)?;
        self.del_edge(txn, RECEIPTS_BY_PAYMENT, receipt.payment_id, receipt.id)
    }

    pub fn receipts_for_payment(
        &self,
        txn: &WriteTransaction,
        payment_id: u64,
    ) -> StoreResult<Vec<PaymentReceipt>> {
        let ids = self.children(txn, RECEIPTS_BY_PAYMENT, payment_id)?;
        let mut receipts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = self.get_row(txn, RECEIPTS, id)? {
                receipts.push(r);
            }
        }
        Ok(receipts)
    }

    pub fn load_receipt(&self, id: u64) -> StoreResult<Option<PaymentReceipt>> {
        self.read_row(RECEIPTS, id)
    }

    pub fn load_receipts_for_payment(&self, payment_id: u64) -> StoreResult<Vec<PaymentReceipt>> {
        let ids = self.read_children(RECEIPTS_BY_PAYMENT, payment_id)?;
        let mut receipts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = self.read_row(RECEIPTS, id)? {
                receipts.push(r);
            }
        }
        Ok(receipts)
    }

    // ========== Deliveries ==========

    pub fn put_delivery(&self, txn: &WriteTransaction, delivery: &Delivery) -> StoreResult<()> {
        self.put_row(txn, DELIVERIES, delivery.id, delivery)?;
        self.add_edge(txn, DELIVERIES_BY_ORDER, delivery.order_id, delivery.id)
    }

    pub fn get_delivery(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<Delivery>> {
        self.get_row(txn, DELIVERIES, id)
    }

    pub fn remove_delivery(&self, txn: &WriteTransaction, delivery: &Delivery) -> StoreResult<()> {
        self.del_row(txn, DELIVERIES, delivery.id)?;
        self.del_edge(txn, DELIVERIES_BY_ORDER, delivery.order_id, delivery.id)
    }

    pub fn deliveries_for_order(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StoreResult<Vec<Delivery>> {
        let ids = self.children(txn, DELIVERIES_BY_ORDER, order_id)?;
        let mut deliveries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(d) = self.get_row(txn, DELIVERIES, id)? {
                deliveries.push(d);
            }
        }
        Ok(deliveries)
    }

    pub fn load_delivery(&self, id: u64) -> StoreResult<Option<Delivery>> {
        self.read_row(DELIVERIES, id)
    }

    pub fn load_deliveries_for_order(&self, order_id: u64) -> StoreResult<Vec<Delivery>> {
        let ids = self.read_children(DELIVERIES_BY_ORDER, order_id)?;
        let mut deliveries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(d) = self.read_row(DELIVERIES, id)? {
                deliveries.push(d);
            }
        }
        Ok(deliveries)
    }

    // ========== Shipments ==========

    pub fn put_shipment(&self, txn: &WriteTransaction, shipment: &Shipment) -> StoreResult<()> {
        self.put_row(txn, SHIPMENTS, shipment.id, shipment)?;
        self.add_edge(txn, SHIPMENTS_BY_DELIVERY, shipment.delivery_id, shipment.id)
    }

    pub fn get_shipment(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<Shipment>> {
        self.get_row(txn, SHIPMENTS, id)
    }

    pub fn remove_shipment(&self, txn: &WriteTransaction, shipment: &Shipment) -> StoreResult<()> {
        self.del_row(txn, SHIPMENTS, shipment.id)?;
        self.del_edge(txn, SHIPMENTS_BY_DELIVERY, shipment.delivery_id, shipment.id)
    }

    pub fn shipments_for_delivery(
        &self,
        txn: &WriteTransaction,
        delivery_id: u64,
    ) -> StoreResult<Vec<Shipment>> {
        let ids = self.children(txn, SHIPMENTS_BY_DELIVERY, delivery_id)?;
        let mut shipments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(s) = self.get_row(txn, SHIPMENTS, id)? {
                shipments.push(s);
            }
        }
        Ok(shipments)
    }

    pub fn load_shipment(&self, id: u64) -> StoreResult<Option<Shipment>> {
        self.read_row(SHIPMENTS, id)
    }

    pub fn load_shipments_for_delivery(&self, delivery_id: u64) -> StoreResult<Vec<Shipment>> {
        let ids = self.read_children(SHIPMENTS_BY_DELIVERY, delivery_id)?;
        let mut shipments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(s) = self.read_row(SHIPMENTS, id)? {
                shipments.push(s);
            }
        }
        Ok(shipments)
    }

    // ========== Shipment items ==========

    pub fn put_shipment_item(&self, txn: &WriteTransaction, item: &ShipmentItem) -> StoreResult<()> {
        self.put_row(txn, SHIPMENT_ITEMS, item.id, item)?;
        self.add_edge(txn, ITEMS_BY_SHIPMENT, item.shipment_id, item.id)?;
        let mut t = txn.open_table(SHIPMENT_ITEM_BY_BASKET_ITEM)?;
        t.insert(item.basket_item_id, item.id)?;
        Ok(())
    }

    pub fn get_shipment_item(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<ShipmentItem>> {
        self.get_row(txn, SHIPMENT_ITEMS, id)
    }

    pub fn remove_shipment_item(
        &self,
        txn: &WriteTransaction,
        item: &ShipmentItem,
    ) -> StoreResult<()> {
        self.del_row(txn, SHIPMENT_ITEMS, item.id)?;
        self.del_edge(txn, ITEMS_BY_SHIPMENT, item.shipment_id, item.id)?;
        let mut t = txn.open_table(SHIPMENT_ITEM_BY_BASKET_ITEM)?;
        t.remove(item.basket_item_id)?;
        Ok(())
    }

    pub fn shipment_items_for_shipment(
        &self,
        txn: &WriteTransaction,
        shipment_id: u64,
    ) -> StoreResult<Vec<ShipmentItem>> {
        let ids = self.children(txn, ITEMS_BY_SHIPMENT, shipment_id)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(i) = self.get_row(txn, SHIPMENT_ITEMS, id)? {
                items.push(i);
            }
        }
        Ok(items)
    }

    /// Shipment item linked to a basket item, if any.
    pub fn shipment_item_for_basket_item(
        &self,
        txn: &WriteTransaction,
        basket_item_id: u64,
    ) -> StoreResult<Option<ShipmentItem>> {
        let t = txn.open_table(SHIPMENT_ITEM_BY_BASKET_ITEM)?;
        let id = match t.get(basket_item_id)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        drop(t);
        self.get_row(txn, SHIPMENT_ITEMS, id)
    }

    // ========== Shipment packages ==========

    pub fn put_package(&self, txn: &WriteTransaction, package: &ShipmentPackage) -> StoreResult<()> {
        self.put_row(txn, PACKAGES, package.id, package)?;
        self.add_edge(txn, PACKAGES_BY_SHIPMENT, package.shipment_id, package.id)
    }

    pub fn get_package(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<ShipmentPackage>> {
        self.get_row(txn, PACKAGES, id)
    }

    pub fn remove_package(
        &self,
        txn: &WriteTransaction,
        package: &ShipmentPackage,
    ) -> StoreResult<()> {
        self.del_row(txn, PACKAGES, package.id)?;
        self.del_edge(txn, PACKAGES_BY_SHIPMENT, package.shipment_id, package.id)
    }

    pub fn packages_for_shipment(
        &self,
        txn: &WriteTransaction,
        shipment_id: u64,
    ) -> StoreResult<Vec<ShipmentPackage>> {
        let ids = self.children(txn, PACKAGES_BY_SHIPMENT, shipment_id)?;
        let mut packages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.get_row(txn, PACKAGES, id)? {
                packages.push(p);
            }
        }
        Ok(packages)
    }

    // ========== Package items ==========

    pub fn put_package_item(
        &self,
        txn: &WriteTransaction,
        item: &ShipmentPackageItem,
    ) -> StoreResult<()> {
        self.put_row(txn, PACKAGE_ITEMS, item.id, item)?;
        self.add_edge(txn, ITEMS_BY_PACKAGE, item.package_id, item.id)?;
        let mut t = txn.open_table(PACKAGE_ITEM_BY_BASKET_ITEM)?;
        t.insert(item.basket_item_id, item.id)?;
        Ok(())
    }

    pub fn get_package_item(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<ShipmentPackageItem>> {
        self.get_row(txn, PACKAGE_ITEMS, id)
    }

    pub fn remove_package_item(
        &self,
        txn: &WriteTransaction,
        item: &ShipmentPackageItem,
    ) -> StoreResult<()> {
        self.del_row(txn, PACKAGE_ITEMS, item.id)?;
        self.del_edge(txn, ITEMS_BY_PACKAGE, item.package_id, item.id)?;
        let mut t = txn.open_table(PACKAGE_ITEM_BY_BASKET_ITEM)?;
        t.remove(item.basket_item_id)?;
        Ok(())
    }

    pub fn package_items_for_package(
        &self,
        txn: &WriteTransaction,
        package_id: u64,
    ) -> StoreResult<Vec<ShipmentPackageItem>> {
        let ids = self.children(txn, ITEMS_BY_PACKAGE, package_id)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(i) = self.get_row(txn, PACKAGE_ITEMS, id)? {
                items.push(i);
            }
        }
        Ok(items)
    }

    /// Package item linked to a basket item, if any.
    pub fn package_item_for_basket_item(
        &self,
        txn: &WriteTransaction,
        basket_item_id: u64,
    ) -> StoreResult<Option<ShipmentPackageItem>> {
        let t = txn.open_table(PACKAGE_ITEM_BY_BASKET_ITEM)?;
        let id = match t.get(basket_item_id)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        drop(t);
        self.get_row(txn, PACKAGE_ITEMS, id)
    }

    // ========== Order returns ==========

    pub fn put_return(&self, txn: &WriteTransaction, ret: &OrderReturn) -> StoreResult<()> {
        self.put_row(txn, RETURNS, ret.id, ret)?;
        self.add_edge(txn, RETURNS_BY_ORDER, ret.order_id, ret.id)
    }

    pub fn get_return(&self, txn: &WriteTransaction, id: u64) -> StoreResult<Option<OrderReturn>> {
        self.get_row(txn, RETURNS, id)
    }

    pub fn remove_return(&self, txn: &WriteTransaction, ret: &OrderReturn) -> StoreResult<()> {
        self.del_row(txn, RETURNS, ret.id)?;
        self.del_edge(txn, RETURNS_BY_ORDER, ret.order_id, ret.id)
    }

    pub fn returns_for_order(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StoreResult<Vec<OrderReturn>> {
        let ids = self.children(txn, RETURNS_BY_ORDER, order_id)?;
        let mut returns = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = self.get_row(txn, RETURNS, id)? {
                returns.push(r);
            }
        }
        Ok(returns)
    }

    pub fn load_return(&self, id: u64) -> StoreResult<Option<OrderReturn>> {
        self.read_row(RETURNS, id)
    }

    pub fn put_return_item(
        &self,
        txn: &WriteTransaction,
        item: &OrderReturnItem,
    ) -> StoreResult<()> {
        self.put_row(txn, RETURN_ITEMS, item.id, item)?;
        self.add_edge(txn, RETURN_ITEMS_BY_RETURN, item.return_id, item.id)
    }

    pub fn get_return_item(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<OrderReturnItem>> {
        self.get_row(txn, RETURN_ITEMS, id)
    }

    pub fn return_items_for_return(
        &self,
        txn: &WriteTransaction,
        return_id: u64,
    ) -> StoreResult<Vec<OrderReturnItem>> {
        let ids = self.children(txn, RETURN_ITEMS_BY_RETURN, return_id)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(i) = self.get_row(txn, RETURN_ITEMS, id)? {
                items.push(i);
            }
        }
        Ok(items)
    }

    pub fn remove_return_item(
        &self,
        txn: &WriteTransaction,
        item: &OrderReturnItem,
    ) -> StoreResult<()> {
        self.del_row(txn, RETURN_ITEMS, item.id)?;
        self.del_edge(txn, RETURN_ITEMS_BY_RETURN, item.return_id, item.id)
    }

    // ========== Comments ==========

    pub fn put_comment(&self, txn: &WriteTransaction, comment: &OrderComment) -> StoreResult<()> {
        self.put_row(txn, COMMENTS, comment.id, comment)?;
        self.add_edge(txn, COMMENTS_BY_ORDER, comment.order_id, comment.id)
    }

    pub fn get_comment(
        &self,
        txn: &WriteTransaction,
        id: u64,
    ) -> StoreResult<Option<OrderComment>> {
        self.get_row(txn, COMMENTS, id)
    }

    pub fn remove_comment(&self, txn: &WriteTransaction, comment: &OrderComment) -> StoreResult<()> {
        self.del_row(txn, COMMENTS, comment.id)?;
        self.del_edge(txn, COMMENTS_BY_ORDER, comment.order_id, comment.id)
    }

    pub fn comments_for_order(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StoreResult<Vec<OrderComment>> {
        let ids = self.children(txn, COMMENTS_BY_ORDER, order_id)?;
        let mut comments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(c) = self.get_row(txn, COMMENTS, id)? {
                comments.push(c);
            }
        }
        Ok(comments)
    }

    // ========== History ==========

    /// Append a history record (key `(order_id, seq)` keeps per-order replay
    /// ordered).
    pub fn append_history(&self, txn: &WriteTransaction, record: &HistoryRecord) -> StoreResult<()> {
        let mut t = txn.open_table(HISTORY)?;
        let value = serde_json::to_vec(record)?;
        t.insert((record.order_id, record.seq), value.as_slice())?;
        Ok(())
    }

    pub fn load_history_for_order(&self, order_id: u64) -> StoreResult<Vec<HistoryRecord>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(HISTORY)?;
        let mut records = Vec::new();
        for entry in t.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}
