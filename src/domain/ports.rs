use crate::domain::model::{Capabilities, FaxActionType, FaxJob, FaxJobStatus, FileInfo};
use crate::utils::error::{FaxError, Result};
use async_trait::async_trait;

/// 傳真後端介面
///
/// 每個操作都可以不實作；預設實作返回 `UnsupportedOperationError`。
/// 後端不直接修改 `FaxJob`，而是返回結果，由分派器在成功後寫回。
#[async_trait]
pub trait FaxBackend: Send + Sync {
    /// 用於日誌與錯誤訊息的後端名稱
    fn name(&self) -> &str;

    /// 此實例所使用的模板化配置鍵部分
    fn property_part(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// 提交傳真，返回後端指派的 id
    async fn submit(&self, _job: &FaxJob) -> Result<Option<String>> {
        Err(FaxError::unsupported(FaxActionType::Submit, self.name()))
    }

    async fn suspend(&self, _job: &FaxJob) -> Result<()> {
        Err(FaxError::unsupported(FaxActionType::Suspend, self.name()))
    }

    async fn resume(&self, _job: &FaxJob) -> Result<()> {
        Err(FaxError::unsupported(FaxActionType::Resume, self.name()))
    }

    async fn cancel(&self, _job: &FaxJob) -> Result<()> {
        Err(FaxError::unsupported(FaxActionType::Cancel, self.name()))
    }

    async fn get_status(&self, _job: &FaxJob) -> Result<FaxJobStatus> {
        Err(FaxError::unsupported(FaxActionType::GetStatus, self.name()))
    }

    /// 釋放後端持有的資源（例如持久連線）
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// 建立與銷毀後端資源（串列埠、遠端會話、HTTP client 等）
#[async_trait]
pub trait ConnectionFactory<R>: Send + Sync {
    async fn create(&self) -> Result<R>;

    async fn destroy(&self, resource: &R) -> Result<()>;
}

/// 將原始輸入（命令列參數、HTTP 請求等）轉換為傳真工作
pub trait RequestParser: Send + Sync {
    type Input: ?Sized;

    fn parse(&self, input: &Self::Input) -> Result<(FaxJob, FileInfo)>;
}
