use sqlx::{Executor, Postgres};

use super::models::transaction::Transaction;

pub async fn create_table<'c, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        CREATE TABLE IF NOT EXISTS transactions (
            id SERIAL PRIMARY KEY,
            step BIGINT,
            type VARCHAR(50),
            amount DOUBLE PRECISION,
            oldbalanceOrg DOUBLE PRECISION,
            newbalanceOrig DOUBLE PRECISION,
            oldbalanceDest DOUBLE PRECISION,
            newbalanceDest DOUBLE PRECISION,
            fraudProbability DOUBLE PRECISION,
            flagged BOOLEAN,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        ",
    )
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn insert_transaction<'c, E>(
    executor: E,
    tx: &Transaction,
    probability: f64,
    flagged: bool,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        INSERT INTO transactions (
            step, type, amount, oldbalanceOrg, newbalanceOrig,
            oldbalanceDest, newbalanceDest, fraudProbability, flagged
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(tx.step)
    .bind(tx.kind.as_str())
    .bind(tx.amount)
    .bind(tx.old_balance_org)
    .bind(tx.new_balance_orig)
    .bind(tx.old_balance_dest)
    .bind(tx.new_balance_dest)
    .bind(probability)
    .bind(flagged)
    .execute(executor)
    .await?;

    tracing::debug!(rows = result.rows_affected(), "transaction inserted");

    Ok(())
}
