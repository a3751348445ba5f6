//! Loading of trained layer parameters. Models emitted by the editor start
//! out with random weights; a weight loader swaps in parameters trained
//! elsewhere, looked up by name from an `.npz` archive.
use crate::WeightPrecision;
use ndarray::{Array, ArrayBase, Dimension, ShapeError, StrideShape};
use ndarray_npy::{NpzReader, ReadNpzError};
use std::io::{Read, Seek};
use std::path::Path;
use thiserror::Error;

pub type WeightResult<T> = Result<T, WeightError>;

#[derive(Error, Debug)]
pub enum WeightError {
    #[error("No weights with name {0} found")]
    WeightKeyError(String),
    #[error("Weight file not found. Filesystem reported error\n {0}.")]
    WeightFileNotFoundError(#[from] std::io::Error),
    #[error("Weight file not readable. Filesystem reported error\n {0}.")]
    WeightFileNpzError(#[from] ReadNpzError),
    #[error("Wrong shape for weight:\n {0}.")]
    WeightShapeError(#[from] ShapeError),
}

pub trait WeightLoader {
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>;
}

pub struct NpzWeightLoader<R>
where
    R: Seek + Read,
{
    handle: R,
}

impl NpzWeightLoader<std::fs::File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> WeightResult<NpzWeightLoader<std::fs::File>> {
        let handle = std::fs::File::open(path)?;
        Ok(NpzWeightLoader { handle })
    }
}

impl<R> WeightLoader for NpzWeightLoader<R>
where
    R: Seek + Read,
{
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        _shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>,
    {
        // The reader in the npy package has to be mut, so we recreate it per
        // lookup instead of making get_weight take a mutable loader borrow
        // everywhere up the stack.
        let mut reader = NpzReader::new(&mut self.handle)?;

        let known = reader.names()?;
        if !known
            .iter()
            .any(|n| n == param_name || n.trim_end_matches(".npy") == param_name)
        {
            return Err(WeightError::WeightKeyError(param_name.to_string()));
        }

        let arr: ArrayBase<_, D> = reader.by_name(param_name)?;

        debug_assert_eq!(&arr.raw_dim(), _shape.into().raw_dim());
        Ok(arr)
    }
}
