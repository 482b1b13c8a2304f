//! 評審セッションの状態管理
//!
//! 状態遷移:
//! - Idle/Success/Error --begin_evaluation--> Loading（画像1枚以上かつAPIキー設定済み）
//! - Loading --finish_evaluation(Ok)--> Success（履歴に1件追加）
//! - Loading --finish_evaluation(Err)--> Error
//! - Success/Error --add_images--> Idle
//! - 任意 --reset--> Idle（画像とプレビューを破棄）
//! - 任意 --load_from_history--> Success（外部呼び出しなし）
//!
//! プレビューハンドルはセッションだけが所有し、画像を手放す経路
//! （削除・リセット・履歴読込による置換・セッション破棄）で必ず1回解放する。

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::preview::PreviewHost;
use crate::rating::extract_rating;
use crate::report::ReportFile;
use crate::settings::{CredentialSources, ResolvedEndpoint};
use crate::store::KeyValueStore;
use crate::types::{
    new_id, EvaluationResult, HistoryRecord, ImageInput, ImageSnapshot, UploadedImage,
};

const FALLBACK_ERROR: &str = "评审失败";

/// セッション状態
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Loading,
    Success(EvaluationResult),
    Error(String),
}

/// 外部評価器へのリクエスト
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    /// Data URL（または素の Base64）の順序付きリスト
    pub images: Vec<String>,
    pub endpoint: ResolvedEndpoint,
}

/// 画像評審を行う外部クライアント
///
/// 1回の呼び出しで1レポートを返す。再試行・タイムアウトは実装側の責務。
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String>;
}

pub struct Session<P: PreviewHost> {
    images: Vec<UploadedImage>,
    state: SessionState,
    /// 実行中リクエストの画像スナップショット
    in_flight: Option<Vec<ImageSnapshot>>,
    previews: P,
}

impl<P: PreviewHost> Session<P> {
    pub fn new(previews: P) -> Self {
        Self {
            images: Vec::new(),
            state: SessionState::Idle,
            in_flight: None,
            previews,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    pub fn previews(&self) -> &P {
        &self.previews
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn result(&self) -> Option<&EvaluationResult> {
        match &self.state {
            SessionState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// 画像を追加し、追加した画像のIDを返す
    ///
    /// 完了済みの結果・エラーは破棄して Idle に戻す。
    /// プレビュー確保に1枚でも失敗した場合は何も追加しない。
    pub fn add_images(&mut self, inputs: Vec<ImageInput>) -> Result<Vec<String>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let added = self.acquire_all(inputs, |_| new_id())?;
        let ids = added.iter().map(|img| img.id.clone()).collect();
        self.images.extend(added);

        if matches!(self.state, SessionState::Success(_) | SessionState::Error(_)) {
            self.state = SessionState::Idle;
        }
        Ok(ids)
    }

    /// 画像を1枚削除（存在しなければ何もしない）
    pub fn remove_image(&mut self, id: &str) -> bool {
        match self.images.iter().position(|img| img.id == id) {
            Some(index) => {
                let image = self.images.remove(index);
                self.previews.release(image.preview);
                true
            }
            None => false,
        }
    }

    /// 画像・結果・エラーをすべて破棄して Idle へ
    pub fn reset(&mut self) {
        self.release_images();
        self.in_flight = None;
        self.state = SessionState::Idle;
    }

    /// 評審を開始して Loading へ遷移し、送信するリクエストを返す
    ///
    /// APIキー未設定は `Error::Config`、画像なしは `Error::Validation`。
    /// どちらも状態は変えない。
    pub fn begin_evaluation(&mut self, sources: &CredentialSources) -> Result<EvaluationRequest> {
        if self.is_loading() {
            return Err(Error::Validation("评审正在进行中，请稍候。".into()));
        }

        let endpoint = sources.resolve()?;

        if self.images.is_empty() {
            return Err(Error::Validation("请至少选择一张图片。".into()));
        }

        let images = self.images.iter().map(|img| img.data_url.clone()).collect();
        self.in_flight = Some(self.images.iter().map(UploadedImage::snapshot).collect());
        self.state = SessionState::Loading;
        tracing::info!(images = self.images.len(), model = %endpoint.model, "evaluation started");

        Ok(EvaluationRequest { images, endpoint })
    }

    /// 外部呼び出しの結果を反映
    ///
    /// Loading 以外（リセット後など）に届いた結果は破棄する。
    pub fn finish_evaluation<S: KeyValueStore>(
        &mut self,
        outcome: Result<String>,
        history: &mut HistoryStore<S>,
    ) -> &SessionState {
        if !self.is_loading() {
            tracing::warn!("evaluation finished outside of loading state; result discarded");
            return &self.state;
        }
        let snapshots = self.in_flight.take().unwrap_or_default();

        match outcome {
            Ok(report_text) => {
                let result = EvaluationResult::new(report_text);
                let rating = extract_rating(&result.report_text);
                history.append(HistoryRecord {
                    id: new_id(),
                    images: snapshots,
                    result: result.clone(),
                    rating,
                });
                tracing::info!(%rating, "evaluation succeeded");
                self.state = SessionState::Success(result);
            }
            Err(e) => {
                let message = e.to_string();
                tracing::info!(error = %message, "evaluation failed");
                self.state = SessionState::Error(if message.trim().is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                });
            }
        }
        &self.state
    }

    /// 開始・外部呼び出し・反映を1回で行う（再試行も同じ呼び出し）
    pub async fn run_evaluation<E, S>(
        &mut self,
        evaluator: &E,
        sources: &CredentialSources,
        history: &mut HistoryStore<S>,
    ) -> Result<&SessionState>
    where
        E: Evaluator + ?Sized,
        S: KeyValueStore,
    {
        let request = self.begin_evaluation(sources)?;
        let outcome = evaluator.evaluate(&request).await;
        Ok(self.finish_evaluation(outcome, history))
    }

    /// 履歴から画像と結果を復元（外部呼び出しなし）
    pub fn load_from_history(&mut self, record: &HistoryRecord) -> Result<()> {
        let inputs = record
            .images
            .iter()
            .map(ImageInput::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<String> = record.images.iter().map(|s| s.id.clone()).collect();

        let restored = self.acquire_all(inputs, |index| ids[index].clone())?;

        self.release_images();
        self.images = restored;
        self.in_flight = None;
        self.state = SessionState::Success(record.result.clone());
        Ok(())
    }

    /// ダウンロード用レポート（Success のときのみ）
    pub fn report(&self) -> Option<ReportFile> {
        self.result().map(ReportFile::from_result)
    }

    /// 全画像のプレビューを確保（失敗時は確保済みを解放して中断）
    fn acquire_all(
        &mut self,
        inputs: Vec<ImageInput>,
        id_for: impl Fn(usize) -> String,
    ) -> Result<Vec<UploadedImage>> {
        let mut acquired = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            match self.previews.acquire(&input) {
                Ok(handle) => acquired.push(UploadedImage::new(id_for(index), input, handle)),
                Err(e) => {
                    for image in acquired {
                        self.previews.release(image.preview);
                    }
                    return Err(e);
                }
            }
        }
        Ok(acquired)
    }

    fn release_images(&mut self) {
        for image in self.images.drain(..) {
            self.previews.release(image.preview);
        }
    }
}

impl<P: PreviewHost> Drop for Session<P> {
    fn drop(&mut self) {
        self.release_images();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{MemoryPreviewHost, PreviewHandle};
    use crate::settings::Settings;
    use crate::store::MemoryStore;
    use crate::types::Rating;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEvaluator {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl FakeEvaluator {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), calls: AtomicUsize::new(0) }
        }

        fn failing(raw: &str) -> Self {
            Self { reply: Err(raw.to_string()), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Evaluator for FakeEvaluator {
        async fn evaluate(&self, _request: &EvaluationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(|raw| Error::external(&raw))
        }
    }

    /// 破棄後も解放数を確認できるホスト
    #[derive(Clone, Default)]
    struct SharedHost(Rc<RefCell<MemoryPreviewHost>>);

    impl PreviewHost for SharedHost {
        fn acquire(&mut self, image: &ImageInput) -> Result<PreviewHandle> {
            self.0.borrow_mut().acquire(image)
        }

        fn release(&mut self, handle: PreviewHandle) {
            self.0.borrow_mut().release(handle)
        }
    }

    /// 指定回数目の確保で失敗するホスト
    struct FlakyHost {
        inner: MemoryPreviewHost,
        fail_on: usize,
        seen: usize,
    }

    impl PreviewHost for FlakyHost {
        fn acquire(&mut self, image: &ImageInput) -> Result<PreviewHandle> {
            self.seen += 1;
            if self.seen == self.fail_on {
                return Err(Error::Validation("not an image".into()));
            }
            self.inner.acquire(image)
        }

        fn release(&mut self, handle: PreviewHandle) {
            self.inner.release(handle)
        }
    }

    fn with_key() -> CredentialSources {
        CredentialSources::new(
            Settings::default(),
            Settings { api_key: Some("test-key".into()), ..Default::default() },
        )
    }

    fn image(name: &str) -> ImageInput {
        ImageInput::new(name, name.as_bytes().to_vec())
    }

    fn history() -> HistoryStore<MemoryStore> {
        HistoryStore::load(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_no_images_stays_idle() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let evaluator = FakeEvaluator::ok("x");
        let mut history = history();

        let result = session.run_evaluation(&evaluator, &with_key(), &mut history).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(evaluator.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_prompts_configuration() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg")]).unwrap();
        let evaluator = FakeEvaluator::ok("x");
        let mut history = history();

        let result = session
            .run_evaluation(&evaluator, &CredentialSources::default(), &mut history)
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(evaluator.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_records_rating() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg"), image("b.jpg")]).unwrap();
        let evaluator = FakeEvaluator::ok("### 报告\n综合评分: 【A】\n");
        let mut history = history();

        session.run_evaluation(&evaluator, &with_key(), &mut history).await.unwrap();

        assert!(matches!(session.state(), SessionState::Success(_)));
        assert_eq!(history.len(), 1);
        let record = &history.records()[0];
        assert_eq!(record.rating, Rating::A);
        assert_eq!(record.images.len(), 2);
        assert_eq!(record.images[0].file_name, "a.jpg");
        assert_eq!(record.result.report_text, "### 报告\n综合评分: 【A】\n");
    }

    #[tokio::test]
    async fn test_success_without_rating() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg")]).unwrap();
        let mut history = history();

        session
            .run_evaluation(&FakeEvaluator::ok("没有评分"), &with_key(), &mut history)
            .await
            .unwrap();
        assert_eq!(history.records()[0].rating, Rating::Unrated);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg")]).unwrap();
        let mut history = history();

        let failing = FakeEvaluator::failing("API_KEY_INVALID");
        session.run_evaluation(&failing, &with_key(), &mut history).await.unwrap();
        assert_eq!(session.error(), Some(crate::error::HINT_INVALID_CREDENTIAL));
        assert!(session.result().is_none());
        assert!(history.is_empty());

        let ok = FakeEvaluator::ok("综合评分：B");
        session.run_evaluation(&ok, &with_key(), &mut history).await.unwrap();
        assert!(session.error().is_none());
        assert!(session.result().is_some());
        assert_eq!(history.records()[0].rating, Rating::B);
    }

    #[test]
    fn test_begin_rejected_while_loading() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();
        assert!(session.is_loading());

        let second = session.begin_evaluation(&with_key());
        assert!(matches!(second, Err(Error::Validation(_))));
        assert!(session.is_loading());
    }

    #[test]
    fn test_completion_after_reset_is_discarded() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        session.add_images(vec![image("a.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();

        session.reset();
        session.finish_evaluation(Ok("late".into()), &mut history);

        assert_eq!(session.state(), &SessionState::Idle);
        assert!(history.is_empty());
    }

    #[test]
    fn test_snapshot_taken_when_request_issued() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        session.add_images(vec![image("a.jpg")]).unwrap();
        let request = session.begin_evaluation(&with_key()).unwrap();
        assert_eq!(request.images.len(), 1);

        // Loading 中の追加は状態を変えない
        session.add_images(vec![image("b.jpg")]).unwrap();
        assert!(session.is_loading());

        session.finish_evaluation(Ok("ok".into()), &mut history);
        assert_eq!(history.records()[0].images.len(), 1);
        assert_eq!(session.images().len(), 2);
    }

    #[test]
    fn test_add_images_after_success_returns_to_idle() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        session.add_images(vec![image("a.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();
        session.finish_evaluation(Ok("ok".into()), &mut history);

        session.add_images(vec![image("b.jpg")]).unwrap();
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.report().is_none());
    }

    #[test]
    fn test_add_images_after_error_returns_to_idle() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        session.add_images(vec![image("a.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();
        session.finish_evaluation(Err(Error::external("boom")), &mut history);
        assert_eq!(session.error(), Some("boom"));

        session.add_images(vec![image("b.jpg")]).unwrap();
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_remove_image_releases_preview() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let ids = session.add_images(vec![image("a.jpg"), image("b.jpg")]).unwrap();

        assert!(session.remove_image(&ids[0]));
        assert!(!session.remove_image("missing"));
        assert_eq!(session.images().len(), 1);
        assert_eq!(session.previews().live_count(), 1);
        assert_eq!(session.previews().released_count(), 1);
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut session = Session::new(MemoryPreviewHost::new());
        session.add_images(vec![image("a.jpg"), image("b.jpg")]).unwrap();
        session.reset();

        assert!(session.images().is_empty());
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.previews().live_count(), 0);
        assert_eq!(session.previews().released_count(), 2);
    }

    #[test]
    fn test_failed_acquire_adds_nothing() {
        let host = FlakyHost { inner: MemoryPreviewHost::new(), fail_on: 2, seen: 0 };
        let mut session = Session::new(host);

        let result = session.add_images(vec![image("a.jpg"), image("b.txt")]);
        assert!(result.is_err());
        assert!(session.images().is_empty());
        assert_eq!(session.previews().inner.live_count(), 0);
    }

    #[test]
    fn test_load_from_history_replaces_images() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        session.add_images(vec![image("old.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();
        session.finish_evaluation(Ok("综合评分: S".into()), &mut history);
        let record = history.records()[0].clone();

        session.reset();
        session.add_images(vec![image("x.jpg"), image("y.jpg")]).unwrap();
        session.load_from_history(&record).unwrap();

        assert_eq!(session.result(), Some(&record.result));
        assert_eq!(session.images().len(), 1);
        assert_eq!(session.images()[0].id, record.images[0].id);
        assert_eq!(session.images()[0].raw_bytes, b"old.jpg");
        assert_eq!(session.previews().live_count(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_report_is_verbatim() {
        let mut session = Session::new(MemoryPreviewHost::new());
        let mut history = history();
        assert!(session.report().is_none());

        session.add_images(vec![image("a.jpg")]).unwrap();
        session.begin_evaluation(&with_key()).unwrap();
        let text = "### [图片 1] 评审报告\n\n**🏷️ 综合评分**: A\n";
        session.finish_evaluation(Ok(text.into()), &mut history);

        let report = session.report().unwrap();
        assert_eq!(report.content, text);
    }

    #[test]
    fn test_drop_releases_previews() {
        let host = SharedHost::default();
        {
            let mut session = Session::new(host.clone());
            session.add_images(vec![image("a.jpg"), image("b.jpg")]).unwrap();
            assert_eq!(host.0.borrow().live_count(), 2);
        }
        assert_eq!(host.0.borrow().live_count(), 0);
        assert_eq!(host.0.borrow().released_count(), 2);
    }
}
