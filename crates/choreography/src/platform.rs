//! Composition of stores, services and consumer groups.

use std::sync::Arc;

use common::messages::subjects;
use document_store::{InMemoryStore, PostgresStore, VersionedStore, run_migrations};
use domain::{
    Item, ItemReplica, ItemService, Order, OrderReplica, OrderService, Payment, PaymentGateway,
    PaymentService,
};
use event_bus::{ConsumerGroup, EventBus, MessageHandler};
use projections::{ItemReplicaSync, OrderReplicaSync};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{PaymentCompletion, ReservationUpdater, Result};

/// Queue group of the item service.
pub const ITEMS_GROUP: &str = "items-service";
/// Queue group of the order service.
pub const ORDERS_GROUP: &str = "orders-service";
/// Queue group of the payment service.
pub const PAYMENTS_GROUP: &str = "payments-service";

type DynStore<D> = Arc<dyn VersionedStore<D>>;
type DynBus = Arc<dyn EventBus>;

pub type Items = ItemService<DynStore<Item>, DynBus>;
pub type Orders = OrderService<DynStore<Order>, DynStore<ItemReplica>, DynBus>;
pub type Payments =
    PaymentService<DynStore<Payment>, DynStore<OrderReplica>, DynBus, Arc<dyn PaymentGateway>>;

/// One store per collection. Each service owns its canonical collection and
/// its replica.
#[derive(Clone)]
pub struct Stores {
    pub items: DynStore<Item>,
    pub item_replicas: DynStore<ItemReplica>,
    pub orders: DynStore<Order>,
    pub order_replicas: DynStore<OrderReplica>,
    pub payments: DynStore<Payment>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            items: Arc::new(InMemoryStore::<Item>::new()),
            item_replicas: Arc::new(InMemoryStore::<ItemReplica>::new()),
            orders: Arc::new(InMemoryStore::<Order>::new()),
            order_replicas: Arc::new(InMemoryStore::<OrderReplica>::new()),
            payments: Arc::new(InMemoryStore::<Payment>::new()),
        }
    }

    /// Migrates the documents table and opens every collection on `pool`.
    pub async fn postgres(pool: PgPool) -> Result<Self> {
        run_migrations(&pool).await?;
        Ok(Self {
            items: Arc::new(PostgresStore::<Item>::new(pool.clone())),
            item_replicas: Arc::new(PostgresStore::<ItemReplica>::new(pool.clone())),
            orders: Arc::new(PostgresStore::<Order>::new(pool.clone())),
            order_replicas: Arc::new(PostgresStore::<OrderReplica>::new(pool.clone())),
            payments: Arc::new(PostgresStore::<Payment>::new(pool)),
        })
    }
}

/// The three services sharing one bus.
#[derive(Clone)]
pub struct Platform {
    pub items: Arc<Items>,
    pub orders: Arc<Orders>,
    pub payments: Arc<Payments>,
    stores: Stores,
    bus: DynBus,
}

impl Platform {
    pub fn new(stores: Stores, bus: DynBus, gateway: Arc<dyn PaymentGateway>) -> Self {
        let items = ItemService::new(Arc::clone(&stores.items), Arc::clone(&bus));
        let orders = OrderService::new(
            Arc::clone(&stores.orders),
            Arc::clone(&stores.item_replicas),
            Arc::clone(&bus),
        );
        let payments = PaymentService::new(
            Arc::clone(&stores.payments),
            Arc::clone(&stores.order_replicas),
            Arc::clone(&bus),
            gateway,
        );

        Self {
            items: Arc::new(items),
            orders: Arc::new(orders),
            payments: Arc::new(payments),
            stores,
            bus,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn bus(&self) -> &DynBus {
        &self.bus
    }

    /// Subscribes every service to the subjects it reacts to and spawns
    /// `workers` workers per subscription.
    ///
    /// All groups are subscribed before any worker starts, so no event
    /// published afterwards is missed.
    pub async fn start_consumers(
        &self,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Consumers> {
        let reservations: Arc<dyn MessageHandler> =
            Arc::new(ReservationUpdater::new(Arc::clone(&self.items)));
        let item_replicas: Arc<dyn MessageHandler> = Arc::new(ItemReplicaSync::new(Arc::clone(
            &self.stores.item_replicas,
        )));
        let completion: Arc<dyn MessageHandler> =
            Arc::new(PaymentCompletion::new(Arc::clone(&self.orders)));
        let order_replicas: Arc<dyn MessageHandler> = Arc::new(OrderReplicaSync::new(
            Arc::clone(&self.stores.order_replicas),
        ));

        let bindings = [
            (subjects::ORDER_CREATED, ITEMS_GROUP, &reservations),
            (subjects::ORDER_CANCELLED, ITEMS_GROUP, &reservations),
            (subjects::ITEM_CREATED, ORDERS_GROUP, &item_replicas),
            (subjects::ITEM_UPDATED, ORDERS_GROUP, &item_replicas),
            (subjects::PAYMENT_CREATED, ORDERS_GROUP, &completion),
            (subjects::ORDER_CREATED, PAYMENTS_GROUP, &order_replicas),
            (subjects::ORDER_CANCELLED, PAYMENTS_GROUP, &order_replicas),
        ];

        let mut groups = Vec::with_capacity(bindings.len());
        for (subject, group, handler) in bindings {
            let consumer =
                ConsumerGroup::subscribe(self.bus.as_ref(), subject, group, Arc::clone(handler), workers)
                    .await?;
            groups.push(consumer);
        }

        let handles = groups
            .into_iter()
            .flat_map(|group| group.spawn(shutdown.clone()))
            .collect();

        tracing::info!(workers, subscriptions = bindings.len(), "consumers started");
        Ok(Consumers { handles })
    }
}

/// Handles of every running consumer worker.
pub struct Consumers {
    handles: Vec<JoinHandle<()>>,
}

impl Consumers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to stop.
    pub async fn join(self) {
        for result in futures_util::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "consumer worker failed");
            }
        }
    }
}
