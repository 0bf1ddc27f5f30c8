use deadpool_postgres::GenericClient;

use crate::db::util::TimedClientExt;
use crate::quiz::{CoreError, Membership};

pub async fn fetch_active_memberships<C: GenericClient>(
    client: &C,
) -> Result<Vec<Membership>, CoreError> {
    let rows = client
        .timed_query_cached(
            "SELECT user_id, company_id, is_active
             FROM quiz.company_membership
             WHERE is_active
             ORDER BY company_id, user_id",
            &[],
            "memberships.fetch_active",
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| Membership {
            user_id: row.get("user_id"),
            company_id: row.get("company_id"),
            is_active: row.get("is_active"),
        })
        .collect())
}
