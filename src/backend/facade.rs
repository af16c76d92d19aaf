// ABOUTME: Deployment facade that runs the four phases against a Docker-compatible engine.
// ABOUTME: Every engine call races the request's cancellation token.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::deploy::{
    DeployFacade, DeploymentSpec, FacadeBuildError, FacadeFactory, FacadeState, Phase, PhaseError,
    PhaseResultExt,
};
use crate::observer::DeploymentObserver;
use crate::request::MountEntry;
use crate::types::{ContainerId, ContainerName, ImageLocator};

use super::engine::{
    ContainerStatus, EngineError, EngineOps, Health, PullCredentials, WorkloadSpec,
};
use super::workload::{self, LABEL_MANAGED, LABEL_PREFIX};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `fut` unless the token fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    phase: Phase,
    fut: impl Future<Output = Result<T, PhaseError>>,
) -> Result<T, PhaseError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PhaseError::cancelled(phase)),
        result = fut => result,
    }
}

/// Validated inputs computed once and reused by later phases.
#[derive(Debug, Clone)]
struct Prepared {
    name: ContainerName,
    workload: WorkloadSpec,
    credentials: Option<PullCredentials>,
    network: Option<String>,
}

/// Facade for one request against an engine.
pub struct EngineFacade<E> {
    engine: Arc<E>,
    config: Arc<AgentConfig>,
    spec: DeploymentSpec,
    observer: Arc<dyn DeploymentObserver>,
    state: FacadeState,
    prepared: Option<Prepared>,
    container: Option<ContainerId>,
}

impl<E: EngineOps> EngineFacade<E> {
    pub fn new(
        engine: Arc<E>,
        config: Arc<AgentConfig>,
        spec: DeploymentSpec,
        observer: Arc<dyn DeploymentObserver>,
    ) -> Self {
        Self {
            engine,
            config,
            spec,
            observer,
            state: FacadeState::default(),
            prepared: None,
            container: None,
        }
    }

    /// Id of the container started by the deploy phase.
    pub fn container_id(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    fn say(&self, line: String) {
        if let Err(e) = self.observer.write(vec![line]) {
            tracing::warn!(request_id = %self.spec.request_id, "observer write failed: {}", e);
        }
    }

    fn begin(&self, phase: Phase) -> Result<(), PhaseError> {
        if self.spec.is_cancelled() {
            return Err(PhaseError::cancelled(phase));
        }
        if !self.state.admits(phase) {
            return Err(PhaseError::out_of_order(phase, self.state));
        }
        tracing::debug!(
            request_id = %self.spec.request_id,
            %phase,
            state = %self.state,
            "phase begins"
        );
        Ok(())
    }

    fn finish(&mut self, phase: Phase) {
        self.state.record(phase);
        tracing::debug!(request_id = %self.spec.request_id, state = %self.state, "phase done");
    }

    /// Validate the request against this backend. No engine calls.
    fn prepare(&self, phase: Phase) -> Result<Prepared, PhaseError> {
        if let Some(ref prepared) = self.prepared {
            return Ok(prepared.clone());
        }

        let name = workload::container_name(&self.spec).in_phase(phase)?;

        let dupes = workload::duplicate_ports(&self.spec);
        if !dupes.is_empty() {
            return Err(PhaseError::for_phase(
                phase,
                format!("duplicate ports: {}", dupes.join(", ")),
            ));
        }

        let workload = workload::workload(&self.spec, &self.config, &name).in_phase(phase)?;
        let credentials = workload::pull_credentials(&self.spec, self.spec.image.host())
            .in_phase_with(phase, "registry credentials")?;

        Ok(Prepared {
            name,
            workload,
            credentials,
            network: workload::managed_network(&self.spec, &self.config),
        })
    }

    fn prepared(&mut self, phase: Phase) -> Result<Prepared, PhaseError> {
        let prepared = self.prepare(phase)?;
        self.prepared = Some(prepared.clone());
        Ok(prepared)
    }

    async fn ensure_network(&self, network: &str) -> Result<(), PhaseError> {
        let phase = Phase::PreDeploy;
        let exists = self
            .engine
            .network_exists(network)
            .await
            .in_phase_with(phase, "inspect network")?;
        if exists {
            return Ok(());
        }

        let mut labels = self.config.labels.clone();
        labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
        match self.engine.create_network(network, &labels).await {
            Ok(id) => {
                self.say(format!("Created network {} ({})", network, id.short()));
                Ok(())
            }
            // Someone else created it between the check and the create.
            Err(EngineError::Conflict(_)) => Ok(()),
            Err(e) => Err(PhaseError::Staging(format!("create network {}: {}", network, e))),
        }
    }

    /// Credentials for `image`, only when it lives on the request's registry.
    fn credentials_for(
        &self,
        image: &ImageLocator,
        prepared: &Prepared,
    ) -> Option<PullCredentials> {
        if image.host() == self.spec.image.host() {
            prepared.credentials.clone()
        } else {
            None
        }
    }

    async fn pull(
        &self,
        image: &ImageLocator,
        credentials: Option<&PullCredentials>,
    ) -> Result<(), PhaseError> {
        self.say(format!("Pulling image {}", image));
        self.engine
            .pull_image(image, credentials)
            .await
            .in_phase_with(Phase::PreDeploy, &format!("pull {}", image))?;
        self.say(format!("Pulled image {}", image));
        Ok(())
    }

    /// Stop and remove a previous container of this instance with the same name.
    async fn remove_previous(&self, name: &ContainerName) -> Result<(), PhaseError> {
        let phase = Phase::Deploy;
        let Some(previous) = self
            .engine
            .find_container(name.as_str())
            .await
            .in_phase_with(phase, "look up previous container")?
        else {
            return Ok(());
        };

        if !self.owned_by_instance(&previous) {
            return Err(PhaseError::Apply(format!(
                "container {} belongs to another instance",
                name
            )));
        }

        self.say(format!("Replacing container {} ({})", name, previous.id.short()));
        if previous.running {
            self.engine
                .stop_container(&previous.id, STOP_TIMEOUT)
                .await
                .in_phase_with(phase, "stop previous container")?;
        }
        match self.engine.remove_container(&previous.id, true).await {
            Ok(()) | Err(EngineError::NotFound(_)) => Ok(()),
            Err(e) => Err(PhaseError::Apply(format!("remove previous container: {}", e))),
        }
    }

    fn owned_by_instance(&self, container: &ContainerStatus) -> bool {
        container.label(LABEL_MANAGED) == Some("true")
            && container.label(LABEL_PREFIX).unwrap_or_default() == workload::prefix(&self.spec)
    }

    /// Fill the config volume from the config image.
    ///
    /// The engine copies the image's files at `path` into an empty named volume
    /// when a container mounting it is created. Without `keep_files` the volume
    /// is dropped first so it is refilled from the new image.
    async fn populate_config_volume(&self, name: &ContainerName) -> Result<(), PhaseError> {
        let phase = Phase::Deploy;
        let Some(ref cc) = self.spec.container.config_container else {
            return Ok(());
        };

        if !cc.keep_files {
            self.engine
                .remove_volume(&cc.volume)
                .await
                .in_phase_with(phase, "reset config volume")?;
        }

        let helper_name = format!("{}-config", name);
        if let Some(stale) = self
            .engine
            .find_container(&helper_name)
            .await
            .in_phase(phase)?
        {
            self.engine
                .remove_container(&stale.id, true)
                .await
                .in_phase_with(phase, "remove stale config container")?;
        }

        let mut helper = WorkloadSpec::helper(helper_name, cc.image.clone());
        helper.mounts.push(MountEntry {
            source: cc.volume.clone(),
            target: cc.path.clone(),
            read_only: false,
        });
        helper
            .labels
            .insert(LABEL_MANAGED.to_string(), "true".to_string());

        let id = self
            .engine
            .create_container(&helper)
            .await
            .in_phase_with(phase, "create config container")?;
        self.engine
            .remove_container(&id, true)
            .await
            .in_phase_with(phase, "remove config container")?;

        self.say(format!("Populated volume {} from {}", cc.volume, cc.image));
        Ok(())
    }

    /// Poll until the container runs (and is healthy, if it has a healthcheck).
    async fn wait_ready(&self, id: &ContainerId) -> Result<(), PhaseError> {
        let poll = async {
            loop {
                let status = self
                    .engine
                    .inspect_container(id)
                    .await
                    .in_phase_with(Phase::Deploy, "inspect container")?;

                match (status.running, status.health) {
                    (true, Health::None | Health::Healthy) => return Ok::<(), PhaseError>(()),
                    (_, Health::Unhealthy) => {
                        return Err(PhaseError::Apply("container is unhealthy".to_string()));
                    }
                    (false, _) if status.exit_code.is_some() => {
                        return Err(PhaseError::Apply(format!(
                            "container exited with code {}",
                            status.exit_code.unwrap_or_default()
                        )));
                    }
                    _ => tokio::time::sleep(self.config.poll_interval).await,
                }
            }
        };

        tokio::time::timeout(self.config.readiness_timeout, poll)
            .await
            .map_err(|_| {
                PhaseError::Apply(format!(
                    "container not ready within {:?}",
                    self.config.readiness_timeout
                ))
            })?
    }

    async fn create_and_start(&self, workload: &WorkloadSpec) -> Result<ContainerId, PhaseError> {
        let id = self
            .engine
            .create_container(workload)
            .await
            .in_phase_with(Phase::Deploy, "create container")?;
        self.say(format!("Created container {} ({})", workload.name, id.short()));

        let started = async {
            self.engine
                .start_container(&id)
                .await
                .in_phase_with(Phase::Deploy, "start container")?;
            self.wait_ready(&id).await
        };

        match cancellable(&self.spec.cancel, Phase::Deploy, started).await {
            Ok(()) => Ok(id),
            Err(e) => {
                // Remove what this attempt created; the previous container is already gone.
                if let Err(cleanup) = self.engine.remove_container(&id, true).await {
                    tracing::warn!(container = %id, "failed to remove container: {}", cleanup);
                } else {
                    self.say(format!("Removed failed container {}", id.short()));
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<E: EngineOps + 'static> DeployFacade for EngineFacade<E> {
    fn state(&self) -> FacadeState {
        self.state
    }

    async fn check_preconditions(&mut self) -> Result<(), PhaseError> {
        let phase = Phase::CheckPreconditions;
        self.begin(phase)?;
        self.say(format!("Checking preconditions on {}", self.config.node_name));

        let cancel = self.spec.cancel.clone();
        cancellable(&cancel, phase, async {
            self.engine
                .ping()
                .await
                .in_phase_with(phase, "engine not reachable")
        })
        .await?;

        let prepared = self.prepared(phase)?;

        let existing = cancellable(&cancel, phase, async {
            self.engine
                .find_container(prepared.name.as_str())
                .await
                .in_phase_with(phase, "look up container")
        })
        .await?;

        if let Some(existing) = existing
            && !self.owned_by_instance(&existing)
        {
            return Err(PhaseError::Precondition(format!(
                "container name {} is already used by another instance",
                prepared.name
            )));
        }

        self.finish(phase);
        Ok(())
    }

    async fn pre_deploy(&mut self) -> Result<(), PhaseError> {
        let phase = Phase::PreDeploy;
        self.begin(phase)?;
        let prepared = self.prepared(phase)?;
        let cancel = self.spec.cancel.clone();

        cancellable(&cancel, phase, async {
            if let Some(ref network) = prepared.network {
                self.ensure_network(network).await?;
            }

            let image = self.spec.image.clone();
            self.pull(&image, prepared.credentials.as_ref()).await?;

            if let Some(ref cc) = self.spec.container.config_container {
                let config_image = ImageLocator::parse(&cc.image)
                    .in_phase_with(phase, "config container image")?;
                let credentials = self.credentials_for(&config_image, &prepared);
                self.pull(&config_image, credentials.as_ref()).await?;
            }
            Ok(())
        })
        .await?;

        self.finish(phase);
        Ok(())
    }

    async fn deploy(&mut self) -> Result<(), PhaseError> {
        let phase = Phase::Deploy;
        self.begin(phase)?;
        let prepared = self.prepared(phase)?;
        let cancel = self.spec.cancel.clone();

        cancellable(&cancel, phase, async {
            self.remove_previous(&prepared.name).await?;
            self.populate_config_volume(&prepared.name).await
        })
        .await?;

        let id = self.create_and_start(&prepared.workload).await?;
        self.say(format!("Container {} is running", prepared.name));
        self.container = Some(id);

        self.finish(phase);
        Ok(())
    }

    async fn post_deploy(&mut self) -> Result<(), PhaseError> {
        let phase = Phase::PostDeploy;
        self.begin(phase)?;
        let prepared = self.prepared(phase)?;
        let cancel = self.spec.cancel.clone();
        let container = self.container.clone();

        let status = cancellable(&cancel, phase, async {
            let status = match container {
                Some(ref id) => self.engine.inspect_container(id).await.in_phase(phase)?,
                None => self
                    .engine
                    .find_container(prepared.name.as_str())
                    .await
                    .in_phase(phase)?
                    .ok_or_else(|| {
                        PhaseError::Finalization(format!("container {} not found", prepared.name))
                    })?,
            };

            if !status.running {
                return Err(PhaseError::Finalization(format!(
                    "container {} stopped after start",
                    prepared.name
                )));
            }

            if let Some(ref network) = prepared.network
                && !status.networks.iter().any(|n| n == network)
            {
                let aliases = vec![prepared.name.to_string()];
                match self
                    .engine
                    .connect_to_network(&status.id, network, &aliases)
                    .await
                {
                    Ok(()) | Err(EngineError::Conflict(_)) => {}
                    Err(e) => {
                        return Err(PhaseError::Finalization(format!(
                            "connect to network {}: {}",
                            network, e
                        )));
                    }
                }
                self.say(format!("Connected {} to network {}", prepared.name, network));
            }
            Ok(status)
        })
        .await?;

        if self.spec.container.is_public() {
            let tls = self.spec.container.expose.is_some_and(|e| e.tls);
            let scheme = if tls { "https" } else { "http" };
            match self.config.ingress_host(prepared.name.as_str()) {
                Some(host) => self.say(format!("Exposed at {}://{}", scheme, host)),
                None => {
                    self.say("Expose requested but no ingress domain is configured".to_string())
                }
            }
        }

        self.say(format!(
            "Deployed {} as {} ({})",
            self.spec.image,
            prepared.name,
            status.id.short()
        ));
        self.container = Some(status.id);

        self.finish(phase);
        Ok(())
    }
}

/// Builds engine facades that share one engine connection.
pub struct EngineFacadeFactory<E> {
    engine: Arc<E>,
    config: Arc<AgentConfig>,
}

impl<E> EngineFacadeFactory<E> {
    pub fn new(engine: Arc<E>, config: Arc<AgentConfig>) -> Self {
        Self { engine, config }
    }
}

impl<E: EngineOps + 'static> FacadeFactory for EngineFacadeFactory<E> {
    fn build(
        &self,
        spec: DeploymentSpec,
        observer: Arc<dyn DeploymentObserver>,
    ) -> Result<Box<dyn DeployFacade>, FacadeBuildError> {
        if spec.image.name().is_empty() {
            return Err(FacadeBuildError("image locator has no name".to_string()));
        }
        Ok(Box::new(EngineFacade::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.config),
            spec,
            observer,
        )))
    }
}
