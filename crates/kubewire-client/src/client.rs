use serde::Serialize;
use tracing::debug;

use kubewire_http::{ClientError, Connection, DEFAULT_BASE_URL, Document, Endpoint, Scope};
use kubewire_types::{FromObject, NamespaceRef, Pod, ReplicationController, decode_list};

use crate::logs::LogOptions;
use crate::watch::WatchEvents;

const PODS: &str = "pods";
const REPLICATION_CONTROLLERS: &str = "replicationcontrollers";
const NAMESPACES: &str = "namespaces";

/// Typed access to pods, replication controllers and namespaces
#[derive(Clone, Debug)]
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Create a client for `namespace` on the default local endpoint
    pub fn new(namespace: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_endpoint(Endpoint::new(DEFAULT_BASE_URL, namespace)?)
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Result<Self, ClientError> {
        Ok(Self::from_connection(Connection::new(endpoint)?))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Namespace used by every namespaced call
    pub fn namespace(&self) -> &str {
        self.connection.namespace()
    }

    /// The underlying connection, for resources without a typed method
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    // ------------------------------------------------------------------------
    // Pods
    // ------------------------------------------------------------------------

    /// Create a pod from a manifest; the result carries server-assigned fields
    pub async fn create_pod<B: Serialize + ?Sized>(&self, pod: &B) -> Result<Pod, ClientError> {
        self.create(PODS, pod, &Scope::Namespaced).await
    }

    pub async fn get_pod(&self, name: &str) -> Result<Pod, ClientError> {
        self.get(&item(PODS, name)?, &Scope::Namespaced).await
    }

    /// List all pods in the namespace
    pub async fn get_pods(&self) -> Result<Vec<Pod>, ClientError> {
        self.list(PODS, &Scope::Namespaced).await
    }

    pub async fn delete_pod(&self, name: &str) -> Result<Document, ClientError> {
        self.connection
            .delete(&item(PODS, name)?, &Scope::Namespaced)
            .await
    }

    /// Subscribe to pod changes in the namespace
    pub async fn watch_pods(&self) -> Result<WatchEvents<Pod>, ClientError> {
        self.watch(PODS).await
    }

    // ------------------------------------------------------------------------
    // Replication controllers
    // ------------------------------------------------------------------------

    pub async fn create_replication_controller<B: Serialize + ?Sized>(
        &self,
        rc: &B,
    ) -> Result<ReplicationController, ClientError> {
        self.create(REPLICATION_CONTROLLERS, rc, &Scope::Namespaced)
            .await
    }

    pub async fn get_replication_controller(
        &self,
        name: &str,
    ) -> Result<ReplicationController, ClientError> {
        self.get(&item(REPLICATION_CONTROLLERS, name)?, &Scope::Namespaced)
            .await
    }

    /// List all replication controllers in the namespace
    pub async fn get_replication_controllers(
        &self,
    ) -> Result<Vec<ReplicationController>, ClientError> {
        self.list(REPLICATION_CONTROLLERS, &Scope::Namespaced).await
    }

    pub async fn delete_replication_controller(
        &self,
        name: &str,
    ) -> Result<Document, ClientError> {
        self.connection
            .delete(&item(REPLICATION_CONTROLLERS, name)?, &Scope::Namespaced)
            .await
    }

    pub async fn watch_replication_controllers(
        &self,
    ) -> Result<WatchEvents<ReplicationController>, ClientError> {
        self.watch(REPLICATION_CONTROLLERS).await
    }

    // ------------------------------------------------------------------------
    // Namespaces (cluster scoped)
    // ------------------------------------------------------------------------

    pub async fn create_namespace<B: Serialize + ?Sized>(
        &self,
        namespace: &B,
    ) -> Result<NamespaceRef, ClientError> {
        self.create(NAMESPACES, namespace, &Scope::Cluster).await
    }

    pub async fn get_namespace(&self, name: &str) -> Result<NamespaceRef, ClientError> {
        self.get(&item(NAMESPACES, name)?, &Scope::Cluster)
            .await
    }

    pub async fn get_namespaces(&self) -> Result<Vec<NamespaceRef>, ClientError> {
        self.list(NAMESPACES, &Scope::Cluster).await
    }

    /// Delete a namespace and everything in it
    pub async fn delete_namespace(&self, name: &str) -> Result<Document, ClientError> {
        self.connection
            .delete(&item(NAMESPACES, name)?, &Scope::Cluster)
            .await
    }

    // ------------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------------

    /// Fetch the full log of a pod's only container
    pub async fn logs(&self, pod: &str) -> Result<String, ClientError> {
        self.logs_with(pod, &LogOptions::default()).await
    }

    pub async fn logs_with(&self, pod: &str, options: &LogOptions) -> Result<String, ClientError> {
        self.connection
            .get_text(
                &format!("{}/log", item(PODS, pod)?),
                &Scope::Namespaced,
                &options.query(),
            )
            .await
    }

    async fn create<K, B>(&self, path: &str, body: &B, scope: &Scope) -> Result<K, ClientError>
    where
        K: FromObject,
        B: Serialize + ?Sized,
    {
        let document = self.connection.post(path, body, scope).await?;
        let created = K::from_object(document)?;
        debug!("created {}", K::KIND);
        Ok(created)
    }

    async fn get<K: FromObject>(&self, path: &str, scope: &Scope) -> Result<K, ClientError> {
        let document = self.connection.get(path, scope).await?;
        Ok(K::from_object(document)?)
    }

    async fn list<K: FromObject>(&self, path: &str, scope: &Scope) -> Result<Vec<K>, ClientError> {
        let document = self.connection.get(path, scope).await?;
        Ok(decode_list(document)?)
    }

    async fn watch<K: FromObject>(&self, path: &str) -> Result<WatchEvents<K>, ClientError> {
        let stream = self.connection.watch(path, &Scope::Namespaced).await?;
        Ok(WatchEvents::new(stream))
    }
}

/// Path of one named object in `collection`
fn item(collection: &str, name: &str) -> Result<String, ClientError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(ClientError::InvalidName(name.to_string()));
    }
    Ok(format!("{}/{}", collection, name))
}
