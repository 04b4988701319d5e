use crate::input::{Column, ColumnData, SampleTable};
use crate::pipeline::PipelineError;

#[inline]
pub fn arcsinh(x: f64, scaling_constant: f64) -> f64 {
    (x / scaling_constant).asinh()
}

pub fn validate_scaling_constant(scaling_constant: f64) -> Result<f64, PipelineError> {
    if scaling_constant.is_finite() && scaling_constant > 0.0 {
        Ok(scaling_constant)
    } else {
        Err(PipelineError::InvalidInput(format!(
            "scaling constant must be a positive finite number, got {}",
            scaling_constant
        )))
    }
}

pub fn arcsinh_in_place(values: &mut [f64], scaling_constant: f64) {
    for v in values.iter_mut() {
        *v = arcsinh(*v, scaling_constant);
    }
}

/// Copy of `table` with every numeric column mapped through `asinh(x / c)`; text columns pass through.
pub fn run_stage1(table: &SampleTable, scaling_constant: f64) -> SampleTable {
    let columns = table
        .columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            data: match &c.data {
                ColumnData::Numeric(v) => {
                    let mut out = v.clone();
                    arcsinh_in_place(&mut out, scaling_constant);
                    ColumnData::Numeric(out)
                }
                ColumnData::Text(v) => ColumnData::Text(v.clone()),
            },
        })
        .collect();
    SampleTable {
        n_rows: table.n_rows,
        columns,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_transform.rs"]
mod tests;
