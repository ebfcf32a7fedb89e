use std::sync::Arc;

use tracing::info;

use course_core::model::{CourseId, GradeRecord};

use crate::api::GradeBackend;
use crate::authorized::AuthorizedClient;
use crate::error::SendError;

/// Posts quiz grades through the auth-retry policy of `AuthorizedClient`.
#[derive(Clone)]
pub struct GradeSubmitter {
    client: AuthorizedClient,
    backend: Arc<dyn GradeBackend>,
}

impl GradeSubmitter {
    #[must_use]
    pub fn new(client: AuthorizedClient, backend: Arc<dyn GradeBackend>) -> Self {
        Self { client, backend }
    }

    /// # Errors
    ///
    /// Returns `SendError` when the grade could not be delivered.
    pub async fn submit(&self, course_id: &CourseId, record: GradeRecord) -> Result<(), SendError> {
        let backend = self.backend.as_ref();
        self.client
            .send(move |token| async move { backend.post_grade(&token, course_id, &record).await })
            .await?;
        info!(
            course_id = %course_id,
            correct = record.correct_count,
            total = record.total_questions,
            "grade submitted"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingGrades;
    use super::*;
    use crate::error::ApiError;
    use crate::session::testing::ScriptedRefresher;
    use crate::session::{Credentials, Session};

    fn submitter(
        refresher: Vec<Result<Credentials, ApiError>>,
        grades: &Arc<RecordingGrades>,
    ) -> (GradeSubmitter, Arc<Session>) {
        let session = Arc::new(Session::new(Arc::new(ScriptedRefresher::new(refresher))));
        session.sign_in(Credentials::new("a1", "r1"));
        let submitter = GradeSubmitter::new(AuthorizedClient::new(session.clone()), grades.clone());
        (submitter, session)
    }

    fn record() -> GradeRecord {
        GradeRecord {
            total_questions: 3,
            correct_count: 2,
        }
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_grade_posted_once_more() {
        let grades = Arc::new(RecordingGrades::failing(vec![ApiError::AuthExpired]));
        let (submitter, _session) = submitter(vec![Ok(Credentials::new("a2", "r2"))], &grades);

        submitter.submit(&CourseId::new("c1"), record()).await.unwrap();

        let posted = grades.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].0, "a1");
        assert_eq!(posted[1].0, "a2");
        assert_eq!(posted[1].2, record());
    }

    #[tokio::test]
    async fn failed_refresh_ends_session_without_retry() {
        let grades = Arc::new(RecordingGrades::failing(vec![ApiError::AuthExpired]));
        let (submitter, session) = submitter(vec![Err(ApiError::AuthExpired)], &grades);

        let err = submitter
            .submit(&CourseId::new("c1"), record())
            .await
            .unwrap_err();

        assert_eq!(err, SendError::Unauthenticated);
        assert_eq!(grades.posted().len(), 1);
        assert!(!session.is_authenticated());
    }
}
