//! The model builder: an ordered sequence of validated layer descriptors
//! plus the shape cursor, edited one layer at a time and frozen by an
//! explicit compile step.
use log::{debug, info};
use thiserror::Error;

use crate::build_errors::{BuildError, BuildResult};
use crate::layers::{LayerDescriptor, LayerKind};
use crate::shape::Shape;
use ml::activation_functions::{ActivationFunction, ActivationLayer};
use ml::convolutions::{Conv2dLayer, MaxPool2dLayer};
use ml::fully_connected::{FeedforwardLayer, FlattenLayer};
use ml::models::{CompileConfig, Layer, SequentialModel};
use ml::normalization::{BatchNormLayer, DropoutLayer};
use ml::weight_loader::{WeightError, WeightLoader};

/// Every network edited here classifies 28x28 grayscale drawings.
pub const INPUT_SHAPE: Shape = Shape::Image {
    height: 28,
    width: 28,
    channels: 1,
};

/// Ten digit classes; the shape a network must end in before it may be
/// compiled.
pub const NUM_CLASSES: usize = 10;

/// Raised when instantiating a compiled description as an executable model.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("could not load trained weights: {0}")]
    Weights(#[from] WeightError),
}

type ChangeListener = Box<dyn FnMut()>;

/// An editable, linear network description.
///
/// The descriptor sequence always starts with the synthetic input
/// descriptor, and every descriptor's input shape equals its predecessor's
/// output shape. Edits are atomic: an operation either succeeds and leaves
/// the invariants intact, or fails and changes nothing.
pub struct ModelBuilder {
    layers: Vec<LayerDescriptor>,
    current_shape: Shape,
    compiled: bool,
    last_activation_is_softmax: bool,
    listeners: Vec<ChangeListener>,
}

impl ModelBuilder {
    pub fn new() -> ModelBuilder {
        ModelBuilder {
            layers: vec![LayerDescriptor::input(INPUT_SHAPE)],
            current_shape: INPUT_SHAPE,
            compiled: false,
            last_activation_is_softmax: false,
            listeners: Vec::new(),
        }
    }

    /// The output shape of the last appended descriptor.
    pub fn current_shape(&self) -> Shape {
        self.current_shape
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn descriptors(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    /// Registers a listener invoked after every successful mutation.
    pub fn add_change_listener(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    /// One human-readable line per descriptor: the layer, its key
    /// parameters and the shape it produces. For display only.
    pub fn summary(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|descriptor| format!("{}  {}", descriptor, descriptor.output_shape()))
            .collect()
    }

    /// Appends a fully connected layer. If the current shape is not flat,
    /// an implicit flatten layer goes in first, so dense layers always see
    /// a rank 1 input.
    pub fn add_dense(&mut self, units: usize) -> BuildResult<()> {
        self.ensure_editable()?;
        let flatten = if self.current_shape.rank() > 1 {
            Some(LayerDescriptor::new(LayerKind::Flatten, self.current_shape)?)
        } else {
            None
        };
        let dense_input = flatten
            .as_ref()
            .map_or(self.current_shape, |f| f.output_shape());
        let dense = LayerDescriptor::new(LayerKind::Dense { units }, dense_input)?;

        if let Some(flatten) = flatten {
            info!("inserting an implicit flatten layer before the dense layer");
            self.push(flatten);
        }
        self.push(dense);
        self.notify();
        Ok(())
    }

    /// Appends an activation layer, given the function's name as entered by
    /// the user.
    pub fn add_activation(&mut self, name: &str) -> BuildResult<()> {
        self.ensure_editable()?;
        let function = ActivationFunction::from_name(name)
            .ok_or_else(|| BuildError::UnsupportedActivation(name.to_string()))?;
        let descriptor = LayerDescriptor::new(LayerKind::Activation { function }, self.current_shape)?;
        self.push(descriptor);
        self.notify();
        Ok(())
    }

    /// Appends a dropout layer, given the rate as entered by the user. The
    /// rate must read as a real number r with 0 < r < 1.
    pub fn add_dropout(&mut self, rate_text: &str) -> BuildResult<()> {
        self.ensure_editable()?;
        let rate: f32 = rate_text
            .trim()
            .parse()
            .map_err(|_| BuildError::UnreadableDropoutRate(rate_text.to_string()))?;
        let descriptor = LayerDescriptor::new(LayerKind::Dropout { rate }, self.current_shape)?;
        self.push(descriptor);
        self.notify();
        Ok(())
    }

    pub fn add_conv2d(
        &mut self,
        filters: usize,
        kernel_height: usize,
        kernel_width: usize,
    ) -> BuildResult<()> {
        self.ensure_editable()?;
        let descriptor = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters,
                kernel: (kernel_height, kernel_width),
            },
            self.current_shape,
        )?;
        self.push(descriptor);
        self.notify();
        Ok(())
    }

    pub fn add_max_pool2d(&mut self, pool_height: usize, pool_width: usize) -> BuildResult<()> {
        self.ensure_editable()?;
        let descriptor = LayerDescriptor::new(
            LayerKind::MaxPool2d {
                pool: (pool_height, pool_width),
            },
            self.current_shape,
        )?;
        self.push(descriptor);
        self.notify();
        Ok(())
    }

    pub fn add_batch_normalization(&mut self) -> BuildResult<()> {
        self.ensure_editable()?;
        let descriptor = LayerDescriptor::new(LayerKind::BatchNorm, self.current_shape)?;
        self.push(descriptor);
        self.notify();
        Ok(())
    }

    /// Freezes the description. The network must end in the ten-class shape
    /// `(10,)`; if the last layer is not a softmax activation, one goes in
    /// before the compile step.
    pub fn add_compile(&mut self) -> BuildResult<()> {
        if self.compiled {
            return Err(BuildError::AlreadyCompiled);
        }
        // The terminal shape is validated before the implicit softmax is
        // appended; a failed compile must leave the sequence untouched.
        let compile = LayerDescriptor::new(LayerKind::Compile, self.current_shape)?;
        if !self.last_activation_is_softmax {
            let softmax = LayerDescriptor::new(
                LayerKind::Activation {
                    function: ActivationFunction::Softmax,
                },
                self.current_shape,
            )?;
            info!("appending a softmax activation before the compile step");
            self.push(softmax);
        }
        self.push(compile);
        self.compiled = true;
        self.notify();
        Ok(())
    }

    /// Removes the last layer. If that uncovers an implicit flatten layer,
    /// the flatten goes with it; the synthetic input descriptor is never
    /// removed.
    pub fn delete_last_layer(&mut self) -> BuildResult<()> {
        if self.layers.len() <= 1 {
            return Err(BuildError::NothingToDelete);
        }
        self.layers.pop();
        while self.layers.len() > 1
            && matches!(self.layers.last().map(LayerDescriptor::kind), Some(LayerKind::Flatten))
        {
            debug!("removing the implicit flatten layer under the deleted layer");
            self.layers.pop();
        }

        let last = self
            .layers
            .last()
            .expect("the input descriptor is never removed");
        self.current_shape = last.output_shape();
        self.compiled = false;
        self.last_activation_is_softmax = matches!(
            last.kind(),
            LayerKind::Activation {
                function: ActivationFunction::Softmax,
            }
        );
        self.notify();
        Ok(())
    }

    /// Resets the builder to the single input descriptor.
    pub fn clear(&mut self) {
        self.layers = vec![LayerDescriptor::input(INPUT_SHAPE)];
        self.current_shape = INPUT_SHAPE;
        self.compiled = false;
        self.last_activation_is_softmax = false;
        self.notify();
    }

    /// Instantiates the compiled description as an executable model with
    /// freshly initialized parameters. Fails if the description has not
    /// been compiled.
    pub fn get_model(&self) -> BuildResult<SequentialModel> {
        if !self.compiled {
            return Err(BuildError::NotCompiled);
        }
        let mut layers: Vec<Box<dyn Layer>> = Vec::new();
        for descriptor in &self.layers {
            if let Some(layer) = stateless_layer(descriptor.kind()) {
                layers.push(layer);
                continue;
            }
            match *descriptor.kind() {
                LayerKind::Input | LayerKind::Compile => {}
                LayerKind::Dense { units } => {
                    let input_units = descriptor.input_shape().num_elements();
                    layers.push(Box::new(FeedforwardLayer::glorot_init(input_units, units)));
                }
                LayerKind::Conv2d {
                    filters,
                    kernel: (kernel_height, kernel_width),
                } => {
                    let channels = descriptor
                        .input_shape()
                        .channels()
                        .expect("convolution descriptors are validated against image input");
                    layers.push(Box::new(Conv2dLayer::glorot_init(
                        channels,
                        filters,
                        kernel_height,
                        kernel_width,
                    )));
                }
                LayerKind::BatchNorm => {
                    let features = descriptor.input_shape().num_features();
                    layers.push(Box::new(BatchNormLayer::identity(features)));
                }
                _ => unreachable!("stateless kinds are handled above"),
            }
        }
        Ok(self.into_model(layers))
    }

    /// Like [`get_model`](Self::get_model), but the dense, convolution and
    /// batch normalization parameters are loaded from a weight archive.
    /// Parameterized layers are numbered per kind in network order, e.g.
    /// `dense_0/weights`, `conv2d_1/kernel`, `batch_norm_0/gamma`.
    pub fn get_model_with_weights<L: WeightLoader>(
        &self,
        loader: &mut L,
    ) -> Result<SequentialModel, EmitError> {
        if !self.compiled {
            return Err(BuildError::NotCompiled.into());
        }
        let mut layers: Vec<Box<dyn Layer>> = Vec::new();
        let (mut dense_idx, mut conv_idx, mut norm_idx) = (0, 0, 0);
        for descriptor in &self.layers {
            if let Some(layer) = stateless_layer(descriptor.kind()) {
                layers.push(layer);
                continue;
            }
            match *descriptor.kind() {
                LayerKind::Input | LayerKind::Compile => {}
                LayerKind::Dense { units } => {
                    let input_units = descriptor.input_shape().num_elements();
                    let weights = loader.get_weight(
                        &format!("dense_{}/weights", dense_idx),
                        (input_units, units),
                    )?;
                    let bias = loader.get_weight(&format!("dense_{}/bias", dense_idx), units)?;
                    dense_idx += 1;
                    layers.push(Box::new(FeedforwardLayer::new(weights, bias)));
                }
                LayerKind::Conv2d {
                    filters,
                    kernel: (kernel_height, kernel_width),
                } => {
                    let channels = descriptor
                        .input_shape()
                        .channels()
                        .expect("convolution descriptors are validated against image input");
                    let kernel = loader.get_weight(
                        &format!("conv2d_{}/kernel", conv_idx),
                        (kernel_height, kernel_width, channels, filters),
                    )?;
                    let bias = loader.get_weight(&format!("conv2d_{}/bias", conv_idx), filters)?;
                    conv_idx += 1;
                    layers.push(Box::new(Conv2dLayer::new(kernel, bias)));
                }
                LayerKind::BatchNorm => {
                    let features = descriptor.input_shape().num_features();
                    let gamma =
                        loader.get_weight(&format!("batch_norm_{}/gamma", norm_idx), features)?;
                    let beta =
                        loader.get_weight(&format!("batch_norm_{}/beta", norm_idx), features)?;
                    let mean =
                        loader.get_weight(&format!("batch_norm_{}/mean", norm_idx), features)?;
                    let variance =
                        loader.get_weight(&format!("batch_norm_{}/variance", norm_idx), features)?;
                    norm_idx += 1;
                    layers.push(Box::new(BatchNormLayer::new(gamma, beta, mean, variance)));
                }
                _ => unreachable!("stateless kinds are handled above"),
            }
        }
        Ok(self.into_model(layers))
    }

    fn into_model(&self, layers: Vec<Box<dyn Layer>>) -> SequentialModel {
        SequentialModel::new(
            layers,
            INPUT_SHAPE.dims(),
            self.current_shape.dims(),
            CompileConfig::default(),
        )
    }

    fn ensure_editable(&self) -> BuildResult<()> {
        if self.compiled {
            Err(BuildError::EditAfterCompile)
        } else {
            Ok(())
        }
    }

    fn push(&mut self, descriptor: LayerDescriptor) {
        self.current_shape = descriptor.output_shape();
        self.last_activation_is_softmax = matches!(
            descriptor.kind(),
            LayerKind::Activation {
                function: ActivationFunction::Softmax,
            }
        );
        self.layers.push(descriptor);
    }

    fn notify(&mut self) {
        for listener in &mut self.listeners {
            listener();
        }
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Layers that carry no trainable parameters.
fn stateless_layer(kind: &LayerKind) -> Option<Box<dyn Layer>> {
    match *kind {
        LayerKind::Activation { function } => Some(Box::new(ActivationLayer::new(function))),
        LayerKind::Dropout { rate } => Some(Box::new(DropoutLayer::new(rate))),
        LayerKind::Flatten => Some(Box::new(FlattenLayer::new())),
        LayerKind::MaxPool2d {
            pool: (pool_height, pool_width),
        } => Some(Box::new(MaxPool2dLayer::new(pool_height, pool_width))),
        _ => None,
    }
}

/// The architecture the application falls back to when no model has been
/// edited yet: two convolution/pooling stages followed by a dense head.
pub fn default_architecture() -> ModelBuilder {
    fn build(builder: &mut ModelBuilder) -> BuildResult<()> {
        builder.add_conv2d(15, 3, 3)?;
        builder.add_activation("relu")?;
        builder.add_max_pool2d(2, 2)?;
        builder.add_conv2d(15, 3, 3)?;
        builder.add_activation("relu")?;
        builder.add_max_pool2d(2, 2)?;
        builder.add_dense(200)?;
        builder.add_batch_normalization()?;
        builder.add_dropout("0.5")?;
        builder.add_dense(10)?;
        builder.add_compile()
    }

    let mut builder = ModelBuilder::new();
    build(&mut builder).expect("the default architecture is valid");
    builder
}
