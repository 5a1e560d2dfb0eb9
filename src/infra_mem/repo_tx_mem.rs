use crate::domain_port::{StorageTx, TxManager};

/// No-op transaction for the process-local backend. Adapters write
/// straight into `MemStore`, so commit and rollback have nothing to do.
pub struct MemTxManager;

#[async_trait::async_trait]
impl TxManager for MemTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        Ok(Box::new(MemTx))
    }
}

pub struct MemTx;

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
