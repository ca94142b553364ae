//! The coordinator tying discovery, readiness and controller construction together.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use futures::FutureExt;
use futures::channel::oneshot;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ManagerOptions, OnReady};
use crate::controller::{ControllerFactory, Controllers, DeviceFactory};
use crate::errors::Error;
use crate::family::DeviceFamily;
use crate::registry::DeviceRegistry;
use crate::request::{DeviceDeclaration, DeviceRequest};
use crate::router::DiscoveryRouter;
use crate::runtime;
use crate::snapshot::{DiscoverySnapshot, DiscoveryStore};
use crate::state::{ListenerId, lock};
use crate::transport::{DiscoveryResponse, DiscoveryTransport};

type Result<T> = std::result::Result<T, Error>;

/// Where a coordination run stands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Phase {
    /// Nothing started yet.
    Idle,
    /// Waiting for discovery to make every requested family ready.
    Searching,
    /// Controllers can be constructed.
    Ready,
    /// The run is over, successfully or not.
    Terminated,
}

struct Run<H> {
    on_ready: Option<OnReady<H>>,
    signal: Option<oneshot::Receiver<DiscoverySnapshot>>,
    discovered: Option<DiscoverySnapshot>,
    readiness: Option<ListenerId>,
    finished: bool,
}

/// State reachable from both the manager and its readiness listener.
struct Shared<F: ControllerFactory> {
    registry: Arc<DeviceRegistry>,
    store: Arc<DiscoveryStore>,
    factory: F,
    run: runtime::Mutex<Run<F::Handle>>,
    controllers: OnceLock<Controllers<F::Handle>>,
    phase: Mutex<Phase>,
}

/// Coordinates discovery and construction of controllers for a fixed set of devices.
///
/// Without auto discovery, controllers are built from the declared options
/// alone, right inside [`new`](Self::new). With it, the manager searches
/// through the configured transport and builds the controllers as soon as the
/// response completing the last requested family arrives, with the discovered
/// addresses filled in. The completion callback fires at most once.
///
/// A factory that has to wait on I/O finishes its work inside
/// [`ready`](Self::ready), which is also where construction errors surface.
///
/// ```
/// use smarthome_manager::{DeviceDeclaration, ManagerOptions, SmartHomeManager};
/// use serde_json::json;
///
/// let devices = vec![DeviceDeclaration::new(
///     "magicHome",
///     json!({"address": "10.0.0.5"}).as_object().cloned().unwrap(),
/// )];
/// let manager = SmartHomeManager::new(devices, ManagerOptions::new()).unwrap();
/// assert!(manager.controllers().is_some());
///
/// let controllers = futures::executor::block_on(manager.ready()).unwrap();
/// let light = controllers.mesh_light().unwrap();
/// assert_eq!(light.addr().to_string(), "10.0.0.5:5577");
/// ```
pub struct SmartHomeManager<F: ControllerFactory = DeviceFactory> {
    shared: Arc<Shared<F>>,
    transport: Mutex<Option<Box<dyn DiscoveryTransport>>>,
}

impl<F: ControllerFactory> SmartHomeManager<F> {
    /// Validate `devices` and start the coordination run.
    ///
    /// On the direct path the controllers are built before this returns, and
    /// a construction failure is returned as the error. With auto discovery
    /// enabled this registers the response router and issues the single search
    /// of the run, so a transport spawning tasks (like [`crate::SsdpClient`])
    /// must be used from within a runtime.
    pub fn new<I, D>(devices: I, options: ManagerOptions<F>) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceDeclaration>,
    {
        let declarations: Vec<DeviceDeclaration> = devices.into_iter().map(Into::into).collect();
        let registry = Arc::new(DeviceRegistry::new(declarations)?);

        let ManagerOptions {
            factory,
            on_ready,
            transport_factory,
            discovery_config,
            auto_discovery,
        } = options;

        let transport_factory = match (auto_discovery, transport_factory) {
            (false, _) => None,
            (true, Some(transport_factory)) => Some(transport_factory),
            (true, None) => return Err(Error::MisconfiguredDiscovery),
        };

        let searching = transport_factory.is_some();
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<F>>| {
            let store = Arc::new(DiscoveryStore::new());
            let mut run = Run {
                on_ready,
                signal: None,
                discovered: None,
                readiness: None,
                finished: false,
            };
            if searching {
                let (sender, receiver) = oneshot::channel();
                run.readiness = Some(subscribe_readiness(&store, weak.clone(), sender));
                run.signal = Some(receiver);
            }
            Shared {
                registry,
                store,
                factory,
                run: runtime::Mutex::new(run),
                controllers: OnceLock::new(),
                phase: Mutex::new(Phase::Idle),
            }
        });

        let transport = match transport_factory {
            Some(transport_factory) => {
                Some(start_discovery(&shared, transport_factory(&discovery_config))?)
            }
            None => {
                *lock(&shared.phase) = Phase::Ready;
                if let Some(Err(e)) = shared.settle().now_or_never() {
                    return Err(e);
                }
                None
            }
        };

        Ok(SmartHomeManager {
            shared,
            transport: Mutex::new(transport),
        })
    }

    /// Wait until the controllers are built.
    ///
    /// Resolves right away once construction has happened in [`new`](Self::new)
    /// or on the discovery response completing readiness. Otherwise it waits
    /// for readiness and finishes construction itself. A failed construction
    /// ends the run: the callback never fires and later calls fail with
    /// [`Error::Terminated`].
    ///
    /// Dropping the returned future before it completes leaves the run intact.
    pub async fn ready(&self) -> Result<&Controllers<F::Handle>> {
        self.shared.settle().await
    }

    /// The handle for `family`, once the controllers are built.
    pub fn controller(&self, family: DeviceFamily) -> Option<&F::Handle> {
        self.shared.controllers.get()?.get(family)
    }

    /// All handles, once built.
    pub fn controllers(&self) -> Option<&Controllers<F::Handle>> {
        self.shared.controllers.get()
    }

    /// Where the run currently stands.
    pub fn phase(&self) -> Phase {
        *lock(&self.shared.phase)
    }

    /// The validated device requests, in declaration order.
    pub fn device_requests(&self) -> &[DeviceRequest] {
        self.shared.registry.requests()
    }

    /// Distinct requested families, in first-requested order.
    pub fn requested_families(&self) -> &[DeviceFamily] {
        self.shared.registry.requested_families()
    }

    /// What discovery has found so far.
    pub fn snapshot(&self) -> Arc<DiscoverySnapshot> {
        self.shared.store.snapshot()
    }
}

impl<F: ControllerFactory> Drop for SmartHomeManager<F> {
    fn drop(&mut self) {
        if let Some(transport) = lock(&self.transport).as_mut() {
            transport.remove_all_listeners();
        }
    }
}

impl<F: ControllerFactory> Shared<F> {
    /// Build every controller once readiness is signalled, firing the callback once.
    async fn settle(&self) -> Result<&Controllers<F::Handle>> {
        if let Some(controllers) = self.controllers.get() {
            return Ok(controllers);
        }

        let mut run = self.run.lock().await;
        if let Some(controllers) = self.controllers.get() {
            return Ok(controllers);
        }
        if run.finished {
            return Err(Error::Terminated);
        }

        if let Some(signal) = run.signal.as_mut() {
            match signal.await {
                Ok(snapshot) => {
                    run.signal = None;
                    run.discovered = Some(snapshot);
                }
                Err(oneshot::Canceled) => {
                    self.finish(&mut run);
                    return Err(Error::DiscoveryAborted);
                }
            }
        }
        if let Some(id) = run.readiness.take() {
            self.store.unsubscribe(&id);
        }

        let options = match self.registry.derive_options(run.discovered.as_ref()) {
            Ok(options) => options,
            Err(e) => {
                self.finish(&mut run);
                return Err(e);
            }
        };

        let mut controllers = Controllers::default();
        for options in options {
            let family = options.family();
            match self.factory.construct(options).await {
                Ok(handle) => {
                    debug!("Constructed {family} controller");
                    controllers.push(family, handle);
                }
                Err(source) => {
                    warn!("Failed to construct {family} controller: {source}");
                    self.finish(&mut run);
                    return Err(Error::construction(family, source));
                }
            }
        }

        let snapshot = match run.discovered.take() {
            Some(snapshot) => snapshot,
            None => self.store.snapshot().as_ref().clone(),
        };
        let controllers = self.controllers.get_or_init(|| controllers);
        info!("{} controllers ready", controllers.len());
        if let Some(on_ready) = run.on_ready.take() {
            on_ready(&snapshot, controllers);
        }
        self.finish(&mut run);
        Ok(controllers)
    }

    fn finish(&self, run: &mut Run<F::Handle>) {
        run.finished = true;
        run.signal = None;
        run.on_ready = None;
        if let Some(id) = run.readiness.take() {
            self.store.unsubscribe(&id);
        }
        *lock(&self.phase) = Phase::Terminated;
    }
}

/// Wire the router into `transport` and issue the search for this run.
///
/// A failed search leaves no handler behind on the transport.
fn start_discovery<F: ControllerFactory>(
    shared: &Shared<F>,
    mut transport: Box<dyn DiscoveryTransport>,
) -> Result<Box<dyn DiscoveryTransport>> {
    transport.remove_all_listeners();

    let router = DiscoveryRouter::new(Arc::clone(&shared.registry), Arc::clone(&shared.store));
    transport.on_response(Arc::new(move |response: &DiscoveryResponse| {
        router.route(response)
    }));

    *lock(&shared.phase) = Phase::Searching;
    let target = shared.registry.search_target();
    info!(
        "Searching for {target} to find {:?}",
        shared.registry.requested_families()
    );
    if let Err(e) = transport.search(target) {
        warn!("Search for {target} failed: {e}");
        transport.remove_all_listeners();
        return Err(e);
    }
    Ok(transport)
}

/// Register the listener that signals readiness once, removes itself and
/// builds the controllers unless a pending `ready` call holds the run.
fn subscribe_readiness<F: ControllerFactory>(
    store: &DiscoveryStore,
    shared: Weak<Shared<F>>,
    sender: oneshot::Sender<DiscoverySnapshot>,
) -> ListenerId {
    let own_id: Arc<OnceLock<ListenerId>> = Arc::new(OnceLock::new());
    let slot = Arc::clone(&own_id);
    let mut sender = Some(sender);

    let id = store.subscribe(move |snapshot: &DiscoverySnapshot| {
        if sender.is_none() {
            return;
        }
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if !shared.registry.is_ready(snapshot) {
            return;
        }
        info!("All requested device families are ready");
        *lock(&shared.phase) = Phase::Ready;
        if let Some(sender) = sender.take() {
            // The receiver is gone only when the run already ended.
            let _ = sender.send(snapshot.clone());
        }
        if let Some(id) = slot.get() {
            shared.store.unsubscribe(id);
        }

        match shared.settle().now_or_never() {
            Some(Ok(_)) => {}
            Some(Err(e)) => warn!("Discovery run ended without controllers: {e}"),
            None => debug!("Controller construction continues in ready()"),
        }
    });
    let _ = own_id.set(id);
    id
}
